//! PDF report rendering.
//!
//! Consumes a [`ReportSnapshot`] (fully-joined request, patient, results)
//! and produces the printable analysis report as raw PDF bytes. Pure
//! formatting: every decision about what appears here was already made by
//! the core when it assembled the snapshot.

use labo_core::report::ReportSnapshot;
use printpdf::*;
use std::io::BufWriter;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const BOTTOM_LIMIT: f32 = 30.0;

// Table column x-positions, in mm from the left edge.
const COL_NAME: f32 = 20.0;
const COL_VALUE: f32 = 95.0;
const COL_UNIT: f32 = 120.0;
const COL_RANGE: f32 = 140.0;
const COL_FLAG: f32 = 180.0;

/// Errors produced while rendering a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to prepare PDF font: {0}")]
    Font(String),
    #[error("failed to write PDF: {0}")]
    Write(String),
}

/// Renders the analysis report for one request. Returns PDF bytes.
pub fn render_request_report(snapshot: &ReportSnapshot) -> Result<Vec<u8>, ReportError> {
    let title = format!("Rapport d'analyses {}", snapshot.request.id.simple());
    let (doc, page1, layer1) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Font(e.to_string()))?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = Mm(280.0);

    // Header
    layer.use_text(&snapshot.lab_name, 16.0, Mm(MARGIN_LEFT), y, &bold);
    y -= Mm(8.0);
    layer.use_text("Rapport d'Analyses", 13.0, Mm(MARGIN_LEFT), y, &bold);
    y -= Mm(12.0);

    // Patient block (left) and request block (right)
    let block_top = y;
    for line in [
        format!("Patient: {}", snapshot.patient.full_name),
        format!(
            "Date de naissance: {}",
            snapshot.patient.date_of_birth.format("%d/%m/%Y")
        ),
        format!("CIN: {}", snapshot.patient.cin),
    ] {
        layer.use_text(&line, 10.0, Mm(MARGIN_LEFT), y, &font);
        y -= Mm(5.0);
    }
    let mut right_y = block_top;
    for line in [
        format!(
            "Date: {}",
            snapshot.request.created_at.format("%d/%m/%Y")
        ),
        format!("Médecin: {}", snapshot.request.doctor_name),
        format!("Statut: {}", snapshot.request.status),
    ] {
        layer.use_text(&line, 10.0, Mm(120.0), right_y, &font);
        right_y -= Mm(5.0);
    }
    y -= Mm(8.0);

    // Results table
    for (text, x) in [
        ("Analyse", COL_NAME),
        ("Résultat", COL_VALUE),
        ("Unité", COL_UNIT),
        ("Valeurs de référence", COL_RANGE),
        ("Obs.", COL_FLAG),
    ] {
        layer.use_text(text, 10.0, Mm(x), y, &bold);
    }
    y -= Mm(6.0);

    for detail in &snapshot.results {
        if y.0 < BOTTOM_LIMIT {
            let (page, new_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(new_layer);
            y = Mm(280.0);
        }

        let value = match detail.result.value {
            Some(v) => format!("{v}"),
            None => "-".into(),
        };
        let value_font = if detail.result.is_abnormal { &bold } else { &font };

        let name_lines = wrap_text(&detail.analysis_type.name, 40);
        layer.use_text(&name_lines[0], 9.0, Mm(COL_NAME), y, &font);
        layer.use_text(&value, 9.0, Mm(COL_VALUE), y, value_font);
        layer.use_text(&detail.analysis_type.unit, 9.0, Mm(COL_UNIT), y, &font);
        layer.use_text(
            &format!(
                "{} - {}",
                detail.analysis_type.reference_min, detail.analysis_type.reference_max
            ),
            9.0,
            Mm(COL_RANGE),
            y,
            &font,
        );
        if detail.result.is_abnormal {
            layer.use_text("!", 9.0, Mm(COL_FLAG), y, &bold);
        }
        for extra in &name_lines[1..] {
            y -= Mm(4.0);
            layer.use_text(extra, 9.0, Mm(COL_NAME), y, &font);
        }
        y -= Mm(5.0);
    }

    // Signature line
    y -= Mm(15.0);
    if y.0 < BOTTOM_LIMIT {
        y = Mm(BOTTOM_LIMIT);
    }
    layer.use_text("Signature du Biologiste", 10.0, Mm(140.0), y, &font);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Write(e.to_string()))?;
    buf.into_inner()
        .map_err(|e| ReportError::Write(e.to_string()))
}

/// Naive character-count wrap; builtin fonts have no metrics to measure
/// against.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
