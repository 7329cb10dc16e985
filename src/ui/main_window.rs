use crate::app::ConverterApp;
use crate::project::{
    output_formats, AudioCodecChoice, ConversionMode, PaletteStrategy, VideoCodecChoice,
    SUBTITLE_FORMATS,
};
use eframe::egui;

pub fn render_main_window(app: &mut ConverterApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        render_header(ui);
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        render_status_bar(app, ui);
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        // Only one run at a time: the form is frozen while it is in flight
        let busy = app.run_state.is_busy();
        ui.add_enabled_ui(!busy, |ui| {
            render_mode_row(app, ui);
            ui.separator();
            render_io_rows(app, ui);
            ui.add_space(4.0);
            render_format_row(app, ui);
            ui.add_space(6.0);
            render_advanced(app, ui);
            render_images(app, ui);
        });

        ui.separator();
        render_controls(app, ui);
        ui.separator();
        render_log(app, ui);
    });

    render_error_dialog(app, ctx);
}

fn render_header(ui: &mut egui::Ui) {
    ui.add_space(4.0);
    ui.heading(crate::APP_NAME);
    ui.label("Powered by FFmpeg • Remux, transcode, extract audio, images, GIFs, and subtitles");
    ui.add_space(4.0);
}

fn render_status_bar(app: &ConverterApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label(format!("FFmpeg: {}", app.ffmpeg.ffmpeg_path().display()));

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if app.tools_available {
                ui.label("Tools OK");
            } else {
                ui.colored_label(egui::Color32::from_rgb(220, 80, 80), "ffmpeg/ffprobe not detected");
            }
        });
    });
}

fn render_mode_row(app: &mut ConverterApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Mode:");
        let mut selected = app.mode;
        egui::ComboBox::from_id_salt("mode")
            .width(260.0)
            .selected_text(selected.name())
            .show_ui(ui, |ui| {
                for mode in ConversionMode::all() {
                    ui.selectable_value(&mut selected, *mode, mode.name());
                }
            });
        if selected != app.mode {
            app.set_mode(selected);
        }
    });
}

fn render_io_rows(app: &mut ConverterApp, ui: &mut egui::Ui) {
    let path_width = (ui.available_width() - 160.0).max(200.0);

    egui::Grid::new("io_grid")
        .num_columns(3)
        .spacing([8.0, 6.0])
        .show(ui, |ui| {
            ui.label("Input");
            if app.mode == ConversionMode::ImagesToVideo {
                ui.add(
                    egui::TextEdit::singleline(&mut app.params.image_source)
                        .desired_width(path_width)
                        .hint_text("Folder of images or a pattern like img_%03d.png"),
                );
            } else {
                ui.add(egui::TextEdit::singleline(&mut app.params.input).desired_width(path_width));
            }
            if ui.button("Browse…").clicked() {
                app.browse_input();
            }
            ui.end_row();

            ui.label("Output");
            ui.add(egui::TextEdit::singleline(&mut app.params.output).desired_width(path_width));
            if ui.button("Browse…").clicked() {
                app.browse_output();
            }
            ui.end_row();
        });
}

fn render_format_row(app: &mut ConverterApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Output format");
        egui::ComboBox::from_id_salt("output_format")
            .width(80.0)
            .selected_text(app.params.output_format.as_str())
            .show_ui(ui, |ui| {
                for format in output_formats() {
                    if ui
                        .selectable_label(app.params.output_format == format, format)
                        .clicked()
                    {
                        app.params.output_format = format.to_string();
                    }
                }
            });

        ui.add_space(12.0);
        ui.add_enabled_ui(app.mode.uses_video_codec(), |ui| {
            ui.label("Video codec");
            egui::ComboBox::from_id_salt("video_codec")
                .width(160.0)
                .selected_text(app.params.video_codec.name())
                .show_ui(ui, |ui| {
                    for codec in VideoCodecChoice::all() {
                        ui.selectable_value(&mut app.params.video_codec, *codec, codec.name());
                    }
                });
        });

        ui.add_space(12.0);
        ui.add_enabled_ui(app.mode.uses_audio_codec(), |ui| {
            ui.label("Audio codec");
            egui::ComboBox::from_id_salt("audio_codec")
                .width(160.0)
                .selected_text(app.params.audio_codec.name())
                .show_ui(ui, |ui| {
                    for codec in AudioCodecChoice::all() {
                        ui.selectable_value(&mut app.params.audio_codec, *codec, codec.name());
                    }
                });
        });
    });
}

fn text_field(ui: &mut egui::Ui, label: &str, value: &mut String, width: f32, hint: &str) {
    ui.label(label);
    ui.add(egui::TextEdit::singleline(value).desired_width(width).hint_text(hint));
}

fn subtitle_format_combo(ui: &mut egui::Ui, id: &str, value: &mut String) {
    egui::ComboBox::from_id_salt(id)
        .width(60.0)
        .selected_text(value.as_str())
        .show_ui(ui, |ui| {
            for format in SUBTITLE_FORMATS {
                if ui.selectable_label(value.as_str() == *format, *format).clicked() {
                    *value = format.to_string();
                }
            }
        });
}

fn render_advanced(app: &mut ConverterApp, ui: &mut egui::Ui) {
    egui::CollapsingHeader::new("Advanced")
        .default_open(true)
        .show(ui, |ui| {
            let params = &mut app.params;
            egui::Grid::new("advanced_grid")
                .num_columns(8)
                .spacing([10.0, 6.0])
                .show(ui, |ui| {
                    text_field(ui, "CRF (x264/x265)", &mut params.crf, 50.0, "auto");
                    text_field(ui, "Video bitrate", &mut params.video_bitrate, 80.0, "2500k");
                    text_field(ui, "Audio bitrate", &mut params.audio_bitrate, 70.0, "192k");
                    text_field(ui, "Scale (WxH)", &mut params.scale, 90.0, "1280:-2");
                    ui.end_row();

                    text_field(ui, "FPS", &mut params.fps, 50.0, "30");
                    text_field(ui, "Start at", &mut params.start_time, 80.0, "HH:MM:SS");
                    text_field(ui, "Duration", &mut params.duration, 70.0, "HH:MM:SS");
                    ui.label("GIF palette");
                    egui::ComboBox::from_id_salt("gif_palette")
                        .selected_text(params.gif_palette.name())
                        .show_ui(ui, |ui| {
                            for strategy in PaletteStrategy::all() {
                                ui.selectable_value(&mut params.gif_palette, *strategy, strategy.name());
                            }
                        });
                    ui.end_row();

                    text_field(ui, "Sub idx", &mut params.subtitle_stream, 40.0, "0");
                    ui.label("Sub in");
                    subtitle_format_combo(ui, "sub_in", &mut params.subtitle_in_format);
                    ui.label("Sub out");
                    subtitle_format_combo(ui, "sub_out", &mut params.subtitle_out_format);
                    ui.end_row();
                });
        });
}

fn render_images(app: &mut ConverterApp, ui: &mut egui::Ui) {
    egui::CollapsingHeader::new("Images")
        .default_open(true)
        .show(ui, |ui| {
            let burning = app.mode == ConversionMode::SubtitleBurn;
            ui.horizontal(|ui| {
                ui.label(if burning {
                    "Subtitle file to burn"
                } else {
                    "Image pattern or folder"
                });
                let width = (ui.available_width() - 260.0).max(160.0);
                ui.add(egui::TextEdit::singleline(&mut app.params.image_source).desired_width(width));
                if ui.button("Browse…").clicked() {
                    app.browse_image_source();
                }
                ui.add_space(12.0);
                text_field(ui, "Images FPS", &mut app.params.images_fps, 50.0, "24");
            });
        });
}

fn render_controls(app: &mut ConverterApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        let busy = app.run_state.is_busy();
        let convert = egui::Button::new("Convert").min_size(egui::vec2(120.0, 28.0));
        if ui.add_enabled(!busy, convert).clicked() {
            app.start_conversion();
        }
        if busy {
            ui.add(egui::Spinner::new());
        }
        ui.label(app.status_message.as_str());
    });
}

fn render_log(app: &mut ConverterApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Log");
        if ui.small_button("Clear").clicked() {
            app.log.clear();
        }
    });

    let row_height = ui.text_style_height(&egui::TextStyle::Monospace);
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show_rows(ui, row_height, app.log.len(), |ui, rows| {
            for line in &app.log[rows] {
                ui.monospace(line.as_str());
            }
        });
}

fn render_error_dialog(app: &mut ConverterApp, ctx: &egui::Context) {
    let mut close = false;
    if let Some(dialog) = &app.error_dialog {
        egui::Window::new(dialog.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(dialog.message.as_str());
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
    }
    if close {
        app.error_dialog = None;
    }
}
