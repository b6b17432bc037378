//! Paginated PDF rendering of a visit report.
//!
//! A4 portrait. Every page carries the branded header band; the first page
//! adds the visit summary card. Each visited person gets a section with an
//! attendance badge, the task checklist or the absence reason, a photo grid
//! and an optional signature. Page breaks are decided before each person
//! block and before each photo tile. Missing image files are skipped.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use printpdf::image_crate::{self, GenericImageView};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Rect, Rgb,
};

use crate::detail::PersonDetail;
use crate::files::sanitize_for_filename;
use crate::{CoreError, CoreResult};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_LEFT: f32 = 10.0;
const MARGIN_RIGHT: f32 = 200.0;
const CONTENT_TOP: f32 = 50.0;

/// Content past this depth forces a new page.
const BOTTOM_LIMIT: f32 = 270.0;

const PHOTO_W: f32 = 45.0;
const PHOTO_H: f32 = 35.0;
const PHOTO_COLS: usize = 3;
const IMAGE_DPI: f32 = 300.0;

/// Document-wide inputs for one rendered report.
pub struct ReportContext<'a> {
    pub company: &'a str,
    pub client: &'a str,
    pub technician: &'a str,
    pub observations: &'a str,
    pub technician_signature: Option<&'a Path>,
    pub logo: Option<&'a Path>,
    pub generated_at: DateTime<Local>,
}

/// Filename the rendered document is written under.
pub fn report_filename(client: &str, generated_at: &DateTime<Local>) -> String {
    format!(
        "Reporte_{}_{}.pdf",
        sanitize_for_filename(client),
        generated_at.format("%Y%m%d_%H%M")
    )
}

/// Render the report into `out_dir` and return the written path.
pub fn render_report(
    ctx: &ReportContext<'_>,
    people: &[PersonDetail],
    out_dir: &Path,
) -> CoreResult<PathBuf> {
    let out_path = out_dir.join(report_filename(ctx.client, &ctx.generated_at));

    let mut page = PageWriter::new(ctx)?;
    page.summary_card(ctx);
    page.section_title("DETALLE DE USUARIOS ATENDIDOS");
    for person in people {
        page.person_section(person);
    }
    page.observations(ctx.observations);
    page.technician_signature(ctx);
    page.draw_footers(ctx.company);
    page.save(&out_path)?;

    Ok(out_path)
}

fn brand_blue() -> Color {
    Color::Rgb(Rgb::new(5.0 / 255.0, 131.0 / 255.0, 242.0 / 255.0, None))
}

fn brand_dark() -> Color {
    Color::Rgb(Rgb::new(0.0, 86.0 / 255.0, 163.0 / 255.0, None))
}

fn white() -> Color {
    Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn gray(level: f32) -> Color {
    Color::Rgb(Rgb::new(level, level, level, None))
}

fn pt_to_mm(pt: f32) -> f32 {
    pt * 0.3528
}

/// Rough Helvetica width estimate, good enough for wrapping and centering.
fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * pt_to_mm(size) * 0.5
}

/// Greedy word wrap against the width estimate. Explicit newlines respected.
fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if estimate_width(&candidate, size) > max_width && !current.is_empty() {
                lines.push(current);
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

enum Fit {
    /// Stretch to exactly this tile.
    Tile(f32, f32),
    /// Fixed height, width follows the aspect ratio.
    Height(f32),
}

/// Decode and place an image with its top-left corner at `(x, y_top)`.
/// Returns the placed size, or `None` when the file is missing or unreadable.
fn place_image(layer: &PdfLayerReference, path: &Path, x: f32, y_top: f32, fit: Fit) -> Option<(f32, f32)> {
    let decoded = match image_crate::open(path) {
        Ok(img) => img,
        Err(err) => {
            tracing::debug!("skipping unreadable image {}: {}", path.display(), err);
            return None;
        }
    };
    // Flatten any alpha channel; the grid draws on white anyway.
    let rgb = image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());
    let (px_w, px_h) = rgb.dimensions();
    if px_w == 0 || px_h == 0 {
        return None;
    }

    let native_w = px_w as f32 * 25.4 / IMAGE_DPI;
    let native_h = px_h as f32 * 25.4 / IMAGE_DPI;
    let (w, h) = match fit {
        Fit::Tile(w, h) => (w, h),
        Fit::Height(h) => (h * native_w / native_h, h),
    };

    let image = Image::from_dynamic_image(&rgb);
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(PAGE_H - y_top - h)),
            scale_x: Some(w / native_w),
            scale_y: Some(h / native_h),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    Some((w, h))
}

struct PageWriter {
    doc: PdfDocumentReference,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    font_italic: IndirectFontRef,
    logo: Option<PathBuf>,
    /// Cursor measured from the top edge, in mm.
    y: f32,
}

impl PageWriter {
    fn new(ctx: &ReportContext<'_>) -> CoreResult<Self> {
        let (doc, page, layer_index) =
            PdfDocument::new("Informe de Visita Técnica", Mm(PAGE_W), Mm(PAGE_H), "contenido");
        let layer = doc.get_page(page).get_layer(layer_index);

        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| CoreError::Pdf(e.to_string()))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| CoreError::Pdf(e.to_string()))?;
        let font_italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| CoreError::Pdf(e.to_string()))?;

        let mut writer = Self {
            doc,
            pages: vec![(page, layer_index)],
            layer,
            font,
            font_bold,
            font_italic,
            logo: ctx.logo.map(Path::to_path_buf),
            y: CONTENT_TOP,
        };
        writer.draw_header();
        Ok(writer)
    }

    fn new_page(&mut self) {
        let (page, layer_index) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "contenido");
        self.layer = self.doc.get_page(page).get_layer(layer_index);
        self.pages.push((page, layer_index));
        self.draw_header();
        self.y = CONTENT_TOP;
    }

    fn put_text(&self, text: &str, size: f32, x: f32, y_top: f32, font: &IndirectFontRef) {
        self.layer
            .use_text(text, size, Mm(x), Mm(PAGE_H - y_top - pt_to_mm(size)), font);
    }

    fn fill_rect(&self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
        self.layer.set_fill_color(color);
        self.layer.add_rect(
            Rect::new(Mm(x0), Mm(PAGE_H - y1), Mm(x1), Mm(PAGE_H - y0)).with_mode(PaintMode::Fill),
        );
    }

    fn stroke_rect(&self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(0.5);
        self.layer.add_rect(
            Rect::new(Mm(x0), Mm(PAGE_H - y1), Mm(x1), Mm(PAGE_H - y0))
                .with_mode(PaintMode::Stroke),
        );
    }

    fn separator(&self, y_top: f32, color: Color) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(0.3);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), Mm(PAGE_H - y_top)), false),
                (Point::new(Mm(MARGIN_RIGHT), Mm(PAGE_H - y_top)), false),
            ],
            is_closed: false,
        });
    }

    /// Blue band with title, subtitle and optional logo, on every page.
    fn draw_header(&self) {
        self.fill_rect(0.0, 0.0, PAGE_W, 40.0, brand_blue());
        self.fill_rect(0.0, 40.0, PAGE_W, 42.0, brand_dark());

        if let Some(logo) = &self.logo {
            place_image(&self.layer, logo, 10.0, 8.0, Fit::Height(24.0));
        }

        self.layer.set_fill_color(white());
        let title = "INFORME DE VISITA TÉCNICA";
        self.put_text(
            title,
            20.0,
            MARGIN_RIGHT - estimate_width(title, 20.0),
            12.0,
            &self.font_bold,
        );
        let subtitle = "Departamento de Soporte IT";
        self.put_text(
            subtitle,
            10.0,
            MARGIN_RIGHT - estimate_width(subtitle, 10.0),
            24.0,
            &self.font,
        );
    }

    /// Card with client, technician, date and time. First page only.
    fn summary_card(&mut self, ctx: &ReportContext<'_>) {
        const TOP: f32 = 45.0;
        self.fill_rect(MARGIN_LEFT, TOP, MARGIN_RIGHT, TOP + 25.0, gray(0.96));
        self.stroke_rect(MARGIN_LEFT, TOP, MARGIN_RIGHT, TOP + 25.0, gray(0.78));

        let rows = [
            (("CLIENTE:", ctx.client), ("FECHA:", ctx.generated_at.format("%d/%m/%Y").to_string())),
            (
                ("TÉCNICO:", ctx.technician),
                ("HORA:", ctx.generated_at.format("%H:%M hrs").to_string()),
            ),
        ];

        let mut row_y = TOP + 4.0;
        for ((label_a, value_a), (label_b, value_b)) in rows {
            self.layer.set_fill_color(gray(0.4));
            self.put_text(label_a, 9.0, 15.0, row_y, &self.font_bold);
            self.put_text(label_b, 9.0, 120.0, row_y, &self.font_bold);
            self.layer.set_fill_color(black());
            self.put_text(value_a, 11.0, 37.0, row_y, &self.font_bold);
            self.put_text(&value_b, 11.0, 140.0, row_y, &self.font_bold);
            row_y += 8.0;
        }

        self.y = TOP + 35.0;
    }

    fn section_title(&mut self, title: &str) {
        self.layer.set_fill_color(brand_blue());
        self.put_text(title, 12.0, MARGIN_LEFT, self.y, &self.font_bold);
        self.separator(self.y + 8.0, brand_blue());
        self.y += 13.0;
    }

    fn person_section(&mut self, person: &PersonDetail) {
        if self.y > 220.0 {
            self.new_page();
        }

        self.layer.set_fill_color(black());
        self.put_text(
            &format!("Usuario: {}", person.name),
            12.0,
            MARGIN_LEFT,
            self.y,
            &self.font_bold,
        );
        self.attendance_badge(person.attended);
        self.y += 10.0;

        if person.attended {
            self.layer.set_fill_color(gray(0.3));
            self.put_text("Tareas Realizadas:", 10.0, MARGIN_LEFT, self.y, &self.font_bold);
            self.y += 6.0;

            self.layer.set_fill_color(black());
            if person.has_task_list() {
                for item in person.task_items() {
                    self.put_text("•", 10.0, 15.0, self.y, &self.font);
                    self.put_text(item, 10.0, 20.0, self.y, &self.font);
                    self.y += 5.0;
                }
            } else {
                for line in wrap_text(&person.work_done, 10.0, 180.0) {
                    self.put_text(&line, 10.0, 15.0, self.y, &self.font);
                    self.y += 5.0;
                }
            }
        } else {
            self.layer.set_fill_color(gray(0.3));
            self.put_text("Motivo:", 10.0, MARGIN_LEFT, self.y, &self.font_bold);
            self.layer.set_fill_color(black());
            for line in wrap_text(&person.reason, 10.0, 165.0) {
                self.put_text(&line, 10.0, 32.0, self.y, &self.font);
                self.y += 6.0;
            }
        }

        self.photo_grid(person);
        self.person_signature(person);

        self.y += 5.0;
        self.separator(self.y, gray(0.9));
        self.y += 5.0;
    }

    fn attendance_badge(&self, attended: bool) {
        let (fill, text_color, label) = if attended {
            (
                Color::Rgb(Rgb::new(0.86, 1.0, 0.86, None)),
                Color::Rgb(Rgb::new(0.0, 0.5, 0.0, None)),
                "ATENDIDO",
            )
        } else {
            (
                Color::Rgb(Rgb::new(1.0, 0.9, 0.9, None)),
                Color::Rgb(Rgb::new(0.7, 0.0, 0.0, None)),
                "NO ATENDIDO",
            )
        };

        let (x0, x1) = (160.0, 200.0);
        self.fill_rect(x0, self.y, x1, self.y + 7.0, fill);
        self.layer.set_fill_color(text_color);
        let x = x0 + (x1 - x0 - estimate_width(label, 9.0)) / 2.0;
        self.put_text(label, 9.0, x, self.y + 1.0, &self.font_bold);
    }

    fn photo_grid(&mut self, person: &PersonDetail) {
        if person.photos.is_empty() || !person.attended {
            return;
        }

        self.y += 3.0;
        self.layer.set_fill_color(brand_blue());
        self.put_text("Evidencia Fotográfica:", 9.0, MARGIN_LEFT, self.y, &self.font_bold);
        self.y += 5.0;

        let mut x = 12.0;
        let mut col = 0usize;
        for photo in &person.photos {
            let path = Path::new(photo);
            if !path.exists() {
                continue;
            }
            if self.y + PHOTO_H > BOTTOM_LIMIT {
                self.new_page();
                x = 12.0;
                col = 0;
            }
            if place_image(&self.layer, path, x, self.y, Fit::Tile(PHOTO_W, PHOTO_H)).is_some() {
                self.stroke_rect(x - 1.0, self.y - 1.0, x + PHOTO_W + 1.0, self.y + PHOTO_H + 1.0, gray(0.86));
                x += PHOTO_W + 5.0;
                col += 1;
                if col == PHOTO_COLS {
                    col = 0;
                    x = 12.0;
                    self.y += PHOTO_H + 5.0;
                }
            }
        }
        if col > 0 {
            self.y += PHOTO_H + 5.0;
        }
    }

    fn person_signature(&mut self, person: &PersonDetail) {
        let Some(signature) = &person.signature else {
            return;
        };
        let path = Path::new(signature);
        if !path.exists() {
            return;
        }

        if self.y > 250.0 {
            self.new_page();
        }
        self.y += 2.0;
        self.layer.set_fill_color(gray(0.5));
        self.put_text(
            &format!("Conformidad: {}", person.name),
            8.0,
            MARGIN_LEFT,
            self.y,
            &self.font_italic,
        );
        self.y += 4.0;
        if place_image(&self.layer, path, 15.0, self.y, Fit::Height(12.0)).is_some() {
            self.y += 14.0;
        }
    }

    fn observations(&mut self, observations: &str) {
        if self.y > 230.0 {
            self.new_page();
        }

        let text = if observations.trim().is_empty() {
            "Sin observaciones adicionales."
        } else {
            observations
        };
        let lines = wrap_text(text, 10.0, 185.0);
        let box_height = 10.0 + lines.len() as f32 * 5.0;

        self.fill_rect(MARGIN_LEFT, self.y, MARGIN_RIGHT, self.y + box_height, gray(0.96));
        self.layer.set_fill_color(brand_blue());
        self.put_text("OBSERVACIONES GENERALES:", 10.0, 12.0, self.y + 2.0, &self.font_bold);
        self.layer.set_fill_color(black());
        let mut line_y = self.y + 8.0;
        for line in &lines {
            self.put_text(line, 10.0, 12.0, line_y, &self.font);
            line_y += 5.0;
        }
        self.y += box_height + 5.0;
    }

    fn technician_signature(&mut self, ctx: &ReportContext<'_>) {
        let Some(path) = ctx.technician_signature else {
            return;
        };
        if !path.exists() {
            return;
        }

        if self.y > 250.0 {
            self.new_page();
        }
        self.y += 10.0;
        self.layer.set_fill_color(gray(0.5));
        self.put_text(
            &format!("Técnico responsable: {}", ctx.technician),
            8.0,
            MARGIN_LEFT,
            self.y,
            &self.font_italic,
        );
        self.y += 4.0;
        place_image(&self.layer, path, 15.0, self.y, Fit::Height(12.0));
    }

    fn draw_footers(&self, company: &str) {
        let total = self.pages.len();
        for (number, (page, layer_index)) in self.pages.iter().enumerate() {
            let layer = self.doc.get_page(*page).get_layer(*layer_index);
            layer.set_fill_color(gray(0.6));
            let text = format!("{} - Pág {}/{}", company, number + 1, total);
            let x = (PAGE_W - estimate_width(&text, 8.0)) / 2.0;
            layer.use_text(text, 8.0, Mm(x), Mm(10.0), &self.font_italic);
        }
    }

    fn save(self, path: &Path) -> CoreResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.doc
            .save(&mut writer)
            .map_err(|e| CoreError::Pdf(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap()
    }

    fn sample_photo(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image_crate::ImageBuffer::from_pixel(24, 18, image_crate::Rgb([180u8, 40u8, 40u8]))
            .save(&path)
            .unwrap();
        path
    }

    fn ctx<'a>(observations: &'a str) -> ReportContext<'a> {
        ReportContext {
            company: "Soporte Ltda",
            client: "Acme S.A.",
            technician: "Ana Rojas",
            observations,
            technician_signature: None,
            logo: None,
            generated_at: fixed_time(),
        }
    }

    #[test]
    fn filename_embeds_sanitized_client_and_timestamp() {
        assert_eq!(
            report_filename("Acme S.A.", &fixed_time()),
            "Reporte_Acme SA_20260305_1430.pdf"
        );
    }

    #[test]
    fn renders_two_person_report() {
        let scratch = tempdir().unwrap();
        let photo_a = sample_photo(scratch.path(), "a.png");
        let photo_b = sample_photo(scratch.path(), "b.png");

        let people = vec![
            PersonDetail {
                name: "Carla Muñoz".into(),
                attended: true,
                work_done: "Windows Update, Antivirus, Limpieza".into(),
                reason: String::new(),
                photos: vec![
                    photo_a.to_string_lossy().into_owned(),
                    photo_b.to_string_lossy().into_owned(),
                ],
                signature: None,
            },
            PersonDetail {
                name: "Luis Soto".into(),
                attended: false,
                work_done: String::new(),
                reason: "De vacaciones".into(),
                photos: vec![],
                signature: None,
            },
        ];

        let out = render_report(&ctx("Todo en orden"), &people, scratch.path()).unwrap();
        assert!(out.exists());
        assert!(std::fs::metadata(&out).unwrap().len() > 1_000);
    }

    #[test]
    fn missing_image_files_are_skipped() {
        let scratch = tempdir().unwrap();
        let people = vec![PersonDetail {
            name: "Carla".into(),
            attended: true,
            work_done: "Revisión".into(),
            reason: String::new(),
            photos: vec!["/no/existe/foto.jpg".into()],
            signature: Some("/no/existe/firma.png".into()),
        }];

        let out = render_report(&ctx(""), &people, scratch.path()).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn long_reports_paginate() {
        let scratch = tempdir().unwrap();
        let people: Vec<PersonDetail> = (0..20)
            .map(|i| PersonDetail {
                name: format!("Usuario {i}"),
                attended: true,
                work_done: "Soporte, Revisión, Actualización".into(),
                reason: String::new(),
                photos: vec![],
                signature: None,
            })
            .collect();

        let out = render_report(&ctx(""), &people, scratch.path()).unwrap();
        // 20 sections at ~40mm each cannot fit one A4 page.
        assert!(std::fs::metadata(&out).unwrap().len() > 2_000);
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("uno dos tres cuatro cinco seis siete ocho", 10.0, 30.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(estimate_width(line, 10.0) <= 30.0 + 1.0);
        }
    }
}
