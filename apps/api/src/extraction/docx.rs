use anyhow::{anyhow, Result};
use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use super::ExtractionStrategy;

/// Walks the DOCX body in document order. Paragraph runs are concatenated,
/// table cells contribute their paragraphs, and the whole document becomes a
/// single page (DOCX carries no reliable page boundaries).
pub struct DocxParagraphStrategy;

impl ExtractionStrategy for DocxParagraphStrategy {
    fn name(&self) -> &'static str {
        "docx-rs"
    }

    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let docx = read_docx(bytes).map_err(|e| anyhow!("failed to read DOCX: {e}"))?;

        let mut lines: Vec<String> = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => push_line(&mut lines, paragraph_text(para)),
                DocumentChild::Table(table) => collect_table(table, &mut lines),
                _ => {}
            }
        }

        Ok(vec![lines.join("\n")])
    }
}

fn push_line(lines: &mut Vec<String>, text: String) {
    if !text.trim().is_empty() {
        lines.push(text);
    }
}

#[allow(irrefutable_let_patterns)]
fn collect_table(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row else { continue };
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell else { continue };
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(para) => push_line(lines, paragraph_text(para)),
                    TableCellContent::Table(inner) => collect_table(inner, lines),
                    _ => {}
                }
            }
        }
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut out = String::new();
    collect_runs(&para.children, &mut out);
    out
}

fn collect_runs(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => collect_runs(&link.children, out),
            _ => {}
        }
    }
}
