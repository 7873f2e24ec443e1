//! Format conversion targets.
//!
//! The office targets are deliberate stubs: they emit a minimal XML
//! document with one placeholder paragraph per page, since real text
//! extraction would need an OCR pipeline. Image targets emit one
//! single-page PDF per source page.

use crate::document::DocumentHandle;
use crate::error::PdfToolError;
use crate::extract::{extract, ExtractMode};
use serde::{Deserialize, Serialize};

/// Placeholder paragraph written for every page of an office export.
const PAGE_PLACEHOLDER: &str = "[Text extraction requires OCR]";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConvertTarget {
    Word,
    Excel,
    PowerPoint,
    Jpeg,
    Png,
}

impl ConvertTarget {
    pub fn extension(&self) -> &'static str {
        match self {
            ConvertTarget::Word => "docx",
            ConvertTarget::Excel => "xlsx",
            ConvertTarget::PowerPoint => "pptx",
            ConvertTarget::Jpeg => "jpg",
            ConvertTarget::Png => "png",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ConvertTarget::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ConvertTarget::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ConvertTarget::PowerPoint => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ConvertTarget::Jpeg => "image/jpeg",
            ConvertTarget::Png => "image/png",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ConvertTarget::Jpeg | ConvertTarget::Png)
    }

    /// XML root element for the office stubs.
    fn office_root(&self) -> &'static str {
        match self {
            ConvertTarget::Word => "document",
            ConvertTarget::Excel => "workbook",
            ConvertTarget::PowerPoint => "presentation",
            _ => "document",
        }
    }
}

/// One file produced by a conversion.
#[derive(Debug, Clone)]
pub struct ConvertOutput {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Convert a document to the target format. `stem` is the input file
/// name without its extension.
pub fn convert(
    handle: &DocumentHandle,
    target: &ConvertTarget,
    stem: &str,
) -> Result<Vec<ConvertOutput>, PdfToolError> {
    if target.is_image() {
        let mut pages = extract(handle, &ExtractMode::EachPage)?;
        let mut outputs = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter_mut().enumerate() {
            outputs.push(ConvertOutput {
                name: format!("{}-{}.{}", stem, index + 1, target.extension()),
                bytes: page.save()?,
                mime: target.mime(),
            });
        }
        Ok(outputs)
    } else {
        Ok(vec![ConvertOutput {
            name: format!("{}.{}", stem, target.extension()),
            bytes: office_stub(target, handle.page_count()).into_bytes(),
            mime: target.mime(),
        }])
    }
}

fn office_stub(target: &ConvertTarget, page_count: usize) -> String {
    let root = target.office_root();
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<{}>\n", root));
    for page in 1..=page_count {
        xml.push_str(&format!(
            "  <page number=\"{}\">{}</page>\n",
            page, PAGE_PLACEHOLDER
        ));
    }
    xml.push_str(&format!("</{}>\n", root));
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdoc::{create_test_pdf, page_texts};
    use pretty_assertions::assert_eq;

    fn handle(pages: u32) -> DocumentHandle {
        let bytes = create_test_pdf(pages, "Cvt");
        DocumentHandle::load("cvt.pdf", &bytes).unwrap()
    }

    #[test]
    fn word_target_emits_one_xml_stub_with_a_paragraph_per_page() {
        let outputs = convert(&handle(3), &ConvertTarget::Word, "report").unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "report.docx");
        let xml = String::from_utf8(outputs[0].bytes.clone()).unwrap();
        assert_eq!(xml.matches(PAGE_PLACEHOLDER).count(), 3);
        assert!(xml.contains("<document>"));
    }

    #[test]
    fn image_target_emits_one_pdf_per_page() {
        let outputs = convert(&handle(2), &ConvertTarget::Png, "scan").unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].name, "scan-1.png");
        assert_eq!(outputs[1].name, "scan-2.png");
        assert_eq!(outputs[0].mime, "image/png");
        // placeholder behavior: the payload is a single-page PDF
        assert!(outputs[1].bytes.starts_with(b"%PDF"));
        assert!(page_texts(&outputs[1].bytes)[0].contains("Cvt-Page-2"));
    }

    #[test]
    fn targets_parse_from_lowercase_names() {
        let t: ConvertTarget = serde_json::from_str("\"powerpoint\"").unwrap();
        assert_eq!(t, ConvertTarget::PowerPoint);
        assert_eq!(t.extension(), "pptx");
    }
}
