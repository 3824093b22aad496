use eframe::egui;
use std::path::PathBuf;

use crate::core::convert::{self, BatchOutcome, OutputFormat};
use crate::core::locale::{self, Locale};
use crate::core::settings::Settings;
use crate::style::{self, ColorPalette, ThemeMode};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "jfif", "webp"];
const PREVIEW_SIZE: f32 = 250.0;

enum DialogKind {
    Success,
    Error,
    Warning,
    Info,
}

struct Dialog {
    kind: DialogKind,
    message: String,
}

struct SettingsDraft {
    save_location: String,
    language: String,
    always_create_folder: bool,
}

pub struct ConverterApp {
    settings: Settings,
    locale: Locale,
    locale_dir: PathBuf,
    theme_mode: ThemeMode,
    file_paths: Vec<PathBuf>,
    target_format: OutputFormat,
    preview: Option<egui::epaint::TextureId>,
    preview_size: egui::Vec2,
    pending_preview: Option<PathBuf>,
    show_settings: bool,
    draft: SettingsDraft,
    languages: Vec<String>,
    dialog: Option<Dialog>,
    title_dirty: bool,
}

impl ConverterApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let settings = Settings::load(&Settings::config_path())?;
        let locale_dir = find_locale_dir();
        let locale = Locale::load(&locale_dir, &settings.language)?;

        let theme_mode = match cc.egui_ctx.theme() {
            egui::Theme::Dark => ThemeMode::Dark,
            egui::Theme::Light => ThemeMode::Light,
        };
        style::apply_theme(&cc.egui_ctx, theme_mode);

        Ok(Self {
            settings,
            locale,
            locale_dir,
            theme_mode,
            file_paths: Vec::new(),
            target_format: OutputFormat::Png,
            preview: None,
            preview_size: egui::Vec2::ZERO,
            pending_preview: None,
            show_settings: false,
            draft: SettingsDraft {
                save_location: String::new(),
                language: String::new(),
                always_create_folder: false,
            },
            languages: Vec::new(),
            dialog: None,
            title_dirty: true,
        })
    }

    fn open_file_dialog(&mut self, ctx: &egui::Context) {
        if let Some(paths) = rfd::FileDialog::new()
            .set_title(&self.locale.select_images)
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_files()
        {
            self.pending_preview = paths.first().cloned();
            self.file_paths = paths;
            self.ensure_preview(ctx);
        }
    }

    /// Runs the whole batch on the UI thread; the window blocks until the
    /// batch finishes or aborts.
    fn convert_images(&mut self) {
        let result = convert::convert_batch(
            &self.file_paths,
            self.target_format,
            &self.settings,
            &self.locale.converted_folder,
        );
        self.dialog = Some(match result {
            Ok(BatchOutcome::NothingSelected) => Dialog {
                kind: DialogKind::Warning,
                message: self.locale.warning.clone(),
            },
            Ok(BatchOutcome::Converted { count, output_dir }) => Dialog {
                kind: DialogKind::Success,
                message: self
                    .locale
                    .success_message(count, &output_dir.display().to_string()),
            },
            Err(e) => {
                log::error!("conversion aborted: {e}");
                Dialog {
                    kind: DialogKind::Error,
                    message: self.locale.error_message(&e.to_string()),
                }
            }
        });
    }

    fn open_settings(&mut self) {
        self.draft = SettingsDraft {
            save_location: self.settings.save_location.clone(),
            language: self.settings.language.clone(),
            always_create_folder: self.settings.always_create_folder,
        };
        self.languages = locale::available_languages(&self.locale_dir);
        self.show_settings = true;
    }

    /// Persists the draft, then reloads settings and locale wholesale so
    /// every visible string reflects the new language.
    fn save_settings(&mut self) {
        let settings = Settings {
            save_location: self.draft.save_location.clone(),
            language: self.draft.language.clone(),
            always_create_folder: self.draft.always_create_folder,
        };

        let saved = settings
            .save(&Settings::config_path())
            .and_then(|_| Settings::load(&Settings::config_path()));
        let reloaded = match saved {
            Ok(settings) => match Locale::load(&self.locale_dir, &settings.language) {
                Ok(locale) => Ok((settings, locale)),
                Err(e) => Err(e.to_string()),
            },
            Err(e) => Err(e.to_string()),
        };

        self.show_settings = false;
        match reloaded {
            Ok((settings, locale)) => {
                self.settings = settings;
                self.locale = locale;
                self.title_dirty = true;
                self.dialog = Some(Dialog {
                    kind: DialogKind::Info,
                    message: self.locale.settings_saved.clone(),
                });
            }
            Err(detail) => {
                log::error!("failed to apply settings: {detail}");
                self.dialog = Some(Dialog {
                    kind: DialogKind::Error,
                    message: self.locale.error_message(&detail),
                });
            }
        }
    }

    fn ensure_preview(&mut self, ctx: &egui::Context) {
        let Some(path) = self.pending_preview.take() else {
            return;
        };

        let rgba = match image::open(&path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::warn!("preview of {} failed: {e}", path.display());
                if let Some(id) = self.preview.take() {
                    ctx.tex_manager().write().free(id);
                }
                return;
            }
        };

        let (w, h) = (rgba.width() as usize, rgba.height() as usize);
        let color_image = egui::ColorImage {
            size: [w, h],
            source_size: egui::vec2(w as f32, h as f32),
            pixels: rgba
                .pixels()
                .map(|p| egui::Color32::from_rgba_unmultiplied(p.0[0], p.0[1], p.0[2], p.0[3]))
                .collect(),
        };

        if let Some(id) = self.preview {
            ctx.tex_manager().write().set(
                id,
                egui::epaint::ImageDelta::full(color_image, egui::TextureOptions::default()),
            );
        } else {
            self.preview = Some(ctx.tex_manager().write().alloc(
                "converter_preview".into(),
                color_image.into(),
                egui::TextureOptions::default(),
            ));
        }
        self.preview_size = egui::vec2(w as f32, h as f32);
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            egui::MenuBar::new().ui(ui, |ui| {
                if ui.button(&self.locale.settings).clicked() {
                    self.open_settings();
                }
            });
            ui.add_space(4.0);
        });
    }

    fn render_preview(&self, ui: &mut egui::Ui) {
        let border = if matches!(self.theme_mode, ThemeMode::Dark) {
            ColorPalette::ZINC_700
        } else {
            ColorPalette::GRAY_300
        };

        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(PREVIEW_SIZE, PREVIEW_SIZE),
            egui::Sense::hover(),
        );
        ui.painter()
            .rect_stroke(rect, 4.0, egui::Stroke::new(1.0, border), egui::StrokeKind::Outside);

        if let Some(id) = self.preview {
            let scale = (PREVIEW_SIZE / self.preview_size.x)
                .min(PREVIEW_SIZE / self.preview_size.y)
                .min(1.0);
            let size = self.preview_size * scale;
            let image_rect = egui::Rect::from_center_size(rect.center(), size);
            egui::Image::new(egui::load::SizedTexture::new(id, size)).paint_at(ui, image_rect);
        }
    }

    fn render_format_selector(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for format in OutputFormat::all() {
                let selected = self.target_format == format;
                let (bg_color, text_color) = if selected {
                    (ColorPalette::BLUE_600, egui::Color32::WHITE)
                } else if matches!(self.theme_mode, ThemeMode::Dark) {
                    (ColorPalette::ZINC_700, ColorPalette::ZINC_300)
                } else {
                    (ColorPalette::GRAY_200, ColorPalette::GRAY_800)
                };

                let button = egui::Button::new(
                    egui::RichText::new(format.extension()).size(13.0).color(text_color),
                )
                .fill(bg_color)
                .stroke(egui::Stroke::NONE)
                .corner_radius(6.0)
                .min_size(egui::vec2(56.0, 28.0));

                if ui.add(button).clicked() {
                    self.target_format = format;
                }
            }
        });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }

        let mut save_clicked = false;
        let mut open = true;

        egui::Window::new(&self.locale.settings)
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(&self.locale.default_save_location);
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.draft.save_location)
                            .desired_width(260.0),
                    );
                    if ui.button(&self.locale.select_folder).clicked() {
                        if let Some(folder) = rfd::FileDialog::new()
                            .set_title(&self.locale.select_folder)
                            .pick_folder()
                        {
                            self.draft.save_location = folder.display().to_string();
                        }
                    }
                });

                ui.add_space(4.0);
                egui::ComboBox::from_label(&self.locale.language)
                    .selected_text(&self.draft.language)
                    .show_ui(ui, |ui| {
                        for code in &self.languages {
                            ui.selectable_value(&mut self.draft.language, code.clone(), code);
                        }
                    });

                ui.add_space(4.0);
                ui.checkbox(
                    &mut self.draft.always_create_folder,
                    &self.locale.always_create_folder,
                );

                ui.add_space(8.0);
                if style::primary_button(ui, &self.locale.save_settings, self.theme_mode).clicked()
                {
                    save_clicked = true;
                }
            });

        if !open {
            self.show_settings = false;
        }
        if save_clicked {
            self.save_settings();
        }
    }

    fn render_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else {
            return;
        };

        let (title, accent) = match dialog.kind {
            DialogKind::Success => ("Success", ColorPalette::GREEN_600),
            DialogKind::Error => ("Error", ColorPalette::RED_500),
            DialogKind::Warning => ("Warning", ColorPalette::AMBER_500),
            DialogKind::Info => ("Info", ColorPalette::BLUE_500),
        };

        let mut close = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.label(
                    egui::RichText::new(&dialog.message)
                        .size(14.0)
                        .color(accent),
                );
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if style::secondary_button(ui, "OK", self.theme_mode).clicked() {
                        close = true;
                    }
                });
            });

        if close {
            self.dialog = None;
        }
    }
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.title_dirty {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.locale.title.clone()));
            self.title_dirty = false;
        }

        self.top_bar(ctx);

        let mut select_clicked = false;
        let mut convert_clicked = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(8.0);
                self.render_preview(ui);

                ui.add_space(4.0);
                let selection_text = if self.file_paths.is_empty() {
                    self.locale.no_file_selected.clone()
                } else {
                    format!("{} {}", self.file_paths.len(), self.locale.files_selected)
                };
                ui.label(selection_text);

                ui.add_space(4.0);
                if style::secondary_button(ui, &self.locale.select_images, self.theme_mode)
                    .clicked()
                {
                    select_clicked = true;
                }

                ui.add_space(8.0);
                self.render_format_selector(ui);

                ui.add_space(8.0);
                if style::primary_button(ui, &self.locale.convert, self.theme_mode).clicked() {
                    convert_clicked = true;
                }
            });
        });

        if select_clicked {
            self.open_file_dialog(ctx);
        }
        if convert_clicked {
            self.convert_images();
        }

        self.render_settings_window(ctx);
        self.render_dialog(ctx);
    }
}

/// Locale files ship beside the executable; fall back to the working
/// directory so `cargo run` from the repo root finds them too.
fn find_locale_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join("locale");
            if candidate.is_dir() {
                return candidate;
            }
        }
    }
    PathBuf::from("locale")
}
