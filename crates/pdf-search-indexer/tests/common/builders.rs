//! Builders for PDF fixtures generated at test time.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// Describes a PDF to generate.
#[derive(Debug, Clone, Default)]
pub struct PdfBuilder {
    pages: Vec<String>,
    title: Option<String>,
    author: Option<String>,
    padding_bytes: usize,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, text: &str) -> Self {
        self.pages.push(text.to_string());
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Adds an unreferenced raw stream so the file crosses size limits.
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding_bytes = bytes;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for text in &self.pages {
            let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if self.title.is_some() || self.author.is_some() {
            let mut info = lopdf::Dictionary::new();
            if let Some(title) = &self.title {
                info.set("Title", Object::string_literal(title.as_str()));
            }
            if let Some(author) = &self.author {
                info.set("Author", Object::string_literal(author.as_str()));
            }
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }

        if self.padding_bytes > 0 {
            doc.add_object(Stream::new(dictionary! {}, vec![b' '; self.padding_bytes]));
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("failed to serialize test PDF");
        bytes
    }
}

/// Bytes whose header declares an encryption dictionary.
pub fn encrypted_pdf() -> Vec<u8> {
    b"%PDF-1.6\n1 0 obj\n<< /Type /Catalog /Encrypt 2 0 R >>\nendobj\n%%EOF\n".to_vec()
}

/// Bytes that start like a PDF but cannot be parsed.
pub fn corrupt_pdf() -> Vec<u8> {
    b"%PDF-1.4\nthis is not a cross reference table\n".to_vec()
}
