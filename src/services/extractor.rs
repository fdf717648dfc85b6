use async_trait::async_trait;
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

use crate::constants;
use crate::models::{Block, ExtractError};
use crate::utils::image_data_uri;

/// Turns a raw document into the ordered block sequence the recognizer consumes.
#[async_trait]
pub trait BlockExtractor: Send + Sync {
    async fn extract(&self, data: &[u8]) -> Result<Vec<Block>, ExtractError>;
    fn extractor_id(&self) -> &'static str;
}

/// Pick an extractor from the upload's file name.
pub fn extractor_for(filename: &str) -> Box<dyn BlockExtractor> {
    if filename.to_lowercase().ends_with(".json") {
        Box::new(JsonBlockExtractor)
    } else {
        Box::new(DocxBlockExtractor)
    }
}

/// Reads WordprocessingML straight out of a `.docx` container.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxBlockExtractor;

/// Accepts blocks already produced by an external converter, as a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBlockExtractor;

#[async_trait]
impl BlockExtractor for DocxBlockExtractor {
    async fn extract(&self, data: &[u8]) -> Result<Vec<Block>, ExtractError> {
        self.extract_blocks(data)
    }

    fn extractor_id(&self) -> &'static str {
        "docx"
    }
}

#[async_trait]
impl BlockExtractor for JsonBlockExtractor {
    async fn extract(&self, data: &[u8]) -> Result<Vec<Block>, ExtractError> {
        let blocks: Vec<Block> = serde_json::from_slice(data)
            .map_err(|e| ExtractError(format!("Invalid block JSON: {}", e)))?;
        Ok(blocks.into_iter().map(Block::normalized).collect())
    }

    fn extractor_id(&self) -> &'static str {
        "json"
    }
}

impl DocxBlockExtractor {
    pub fn extract_blocks(&self, data: &[u8]) -> Result<Vec<Block>, ExtractError> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ExtractError(format!("Invalid DOCX (not a valid ZIP): {}", e)))?;

        let document_xml = read_part(&mut archive, constants::DOCX_DOCUMENT_PART)?
            .ok_or_else(|| ExtractError(format!("Invalid DOCX: missing {}", constants::DOCX_DOCUMENT_PART)))?;
        let images = match read_part(&mut archive, constants::DOCX_RELS_PART)? {
            Some(rels) => load_images(&mut archive, &rels)?,
            None => HashMap::new(),
        };

        let blocks = parse_document_xml(&document_xml, &images)?;
        debug!("Extracted {} blocks ({} images) from DOCX", blocks.len(), images.len());
        Ok(blocks)
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>, ExtractError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ExtractError(format!("Failed to open {}: {}", name, e))),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ExtractError(format!("Failed to read {}: {}", name, e)))?;
    Ok(Some(content))
}

/// Map relationship ids of embedded pictures to data URIs.
fn load_images<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    rels_xml: &str,
) -> Result<HashMap<String, String>, ExtractError> {
    let mut reader = Reader::from_str(rels_xml);
    let mut targets = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let id = attr(&e, b"Id");
                let kind = attr(&e, b"Type").unwrap_or_default();
                let external = attr(&e, b"TargetMode").is_some_and(|m| m == "External");
                if let (Some(id), Some(target)) = (id, attr(&e, b"Target")) {
                    if kind.ends_with("/image") && !external {
                        targets.push((id, target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError(format!("Malformed relationships XML: {}", e))),
            _ => {}
        }
    }

    let mut images = HashMap::new();
    for (id, target) in targets {
        let part = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("{}{}", constants::DOCX_PART_PREFIX, target),
        };
        let Ok(mut file) = archive.by_name(&part) else {
            debug!("Image part {} referenced by {} is missing", part, id);
            continue;
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| ExtractError(format!("Failed to read {}: {}", part, e)))?;
        images.insert(id, image_data_uri(&part, &data));
    }
    Ok(images)
}

fn attr(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

#[derive(Debug, Default, Clone, Copy)]
struct RunStyle {
    bold: bool,
    italic: bool,
    underline: bool,
}

#[derive(Debug, Default)]
struct BlockBuilder {
    text: String,
    markup: String,
}

impl BlockBuilder {
    fn push_text(&mut self, text: &str, style: RunStyle) {
        self.text.push_str(text);
        let mut open = String::new();
        let mut close = String::new();
        if style.bold {
            open.push_str("<strong>");
            close.insert_str(0, "</strong>");
        }
        if style.italic {
            open.push_str("<em>");
            close.insert_str(0, "</em>");
        }
        if style.underline {
            open.push_str("<u>");
            close.insert_str(0, "</u>");
        }
        self.markup.push_str(&open);
        self.markup.push_str(text);
        self.markup.push_str(&close);
    }

    fn push_break(&mut self) {
        self.text.push(' ');
        self.markup.push_str(constants::LINE_BREAK);
    }

    fn push_image(&mut self, src: &str) {
        self.markup.push_str(&format!(r#"<img src="{}" />"#, src));
    }

    fn append(&mut self, other: BlockBuilder) {
        if other.text.trim().is_empty() && !other.markup.contains("<img") {
            return;
        }
        if !self.markup.is_empty() {
            self.text.push(' ');
            self.markup.push(' ');
        }
        self.text.push_str(&other.text);
        self.markup.push_str(&other.markup);
    }

    fn build(self) -> Option<Block> {
        let markup = merge_adjacent_tags(&normalize_math_delimiters(self.markup.trim()));
        let block = Block::new(normalize_math_delimiters(&self.text), markup);
        if block.is_empty() { None } else { Some(block) }
    }
}

/// `\[ ... \]` display math becomes inline `$ ... $` so the renderer keeps it on the line.
pub fn normalize_math_delimiters(text: &str) -> String {
    text.replace("\\[", "$").replace("\\]", "$")
}

fn merge_adjacent_tags(markup: &str) -> String {
    markup
        .replace("</u><u>", "")
        .replace("</em><em>", "")
        .replace("</strong><strong>", "")
}

/// `w:val="0"` / `"false"` / `"none"` switches a toggle property off.
fn toggle_on(element: &BytesStart) -> bool {
    !matches!(
        attr(element, b"w:val").as_deref(),
        Some("0") | Some("false") | Some("none")
    )
}

fn parse_document_xml(xml: &str, images: &HashMap<String, String>) -> Result<Vec<Block>, ExtractError> {
    let mut reader = Reader::from_str(xml);

    let mut blocks = Vec::new();
    let mut paragraph = BlockBuilder::default();
    let mut table = BlockBuilder::default();
    let mut para_depth = 0usize;
    let mut table_depth = 0usize;
    let mut style = RunStyle::default();
    let mut in_run = false;
    let mut in_run_props = false;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ExtractError(format!("Malformed document XML at {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:p" => {
                    para_depth += 1;
                    if para_depth == 1 {
                        paragraph = BlockBuilder::default();
                    }
                }
                b"w:r" | b"m:r" => {
                    in_run = true;
                    style = RunStyle::default();
                }
                b"w:rPr" => in_run_props = true,
                b"w:t" | b"m:t" => in_text = true,
                b"w:b" if in_run_props => style.bold = toggle_on(&e),
                b"w:i" if in_run_props => style.italic = toggle_on(&e),
                b"w:u" if in_run_props => style.underline = toggle_on(&e),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:b" if in_run_props => style.bold = toggle_on(&e),
                b"w:i" if in_run_props => style.italic = toggle_on(&e),
                b"w:u" if in_run_props => style.underline = toggle_on(&e),
                b"w:br" | b"w:cr" if para_depth > 0 => paragraph.push_break(),
                // w:tab under w:pPr/w:tabs is a tab stop, not text
                b"w:tab" if in_run && para_depth > 0 => paragraph.push_text(" ", RunStyle::default()),
                b"a:blip" | b"v:imagedata" if para_depth > 0 => {
                    let rel = attr(&e, b"r:embed").or_else(|| attr(&e, b"r:id"));
                    if let Some(src) = rel.and_then(|id| images.get(&id)) {
                        paragraph.push_image(src);
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text && para_depth > 0 => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError(format!("Bad text in document XML: {}", e)))?;
                paragraph.push_text(&text, style);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" | b"m:t" => in_text = false,
                b"w:r" | b"m:r" => {
                    in_run = false;
                    style = RunStyle::default();
                }
                b"w:rPr" => in_run_props = false,
                b"w:p" => {
                    para_depth = para_depth.saturating_sub(1);
                    if para_depth == 0 {
                        let finished = std::mem::take(&mut paragraph);
                        if table_depth > 0 {
                            table.append(finished);
                        } else if let Some(block) = finished.build() {
                            blocks.push(block);
                        }
                    }
                }
                b"w:tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        if let Some(block) = std::mem::take(&mut table).build() {
                            blocks.push(block);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
</Relationships>"#;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="w" xmlns:a="a" xmlns:r="r" xmlns:m="m"><w:body>{}</w:body></w:document>"#,
            inner
        )
    }

    fn docx(document: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file(constants::DOCX_DOCUMENT_PART, SimpleFileOptions::default())
                .unwrap();
            zip.write_all(document.as_bytes()).unwrap();
            for (name, data) in extra {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_paragraphs_become_blocks() {
        let xml = body(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Câu 1:</w:t></w:r><w:r><w:t xml:space="preserve"> Tính \[x^2\]</w:t></w:r></w:p>
               <w:p></w:p>
               <w:p><w:r><w:t>A. 3</w:t></w:r><w:r><w:tab/><w:t>B. 4</w:t></w:r></w:p>"#,
        );
        let blocks = DocxBlockExtractor.extract_blocks(&docx(&xml, &[])).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].plain_text, "Câu 1: Tính $x^2$");
        assert_eq!(blocks[0].markup, "<strong>Câu 1:</strong> Tính $x^2$");
        assert_eq!(blocks[1].plain_text, "A. 3 B. 4");
    }

    #[test]
    fn test_bold_off_and_merged_runs() {
        let xml = body(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Lời</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve"> giải</w:t></w:r><w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t xml:space="preserve"> tiếp</w:t></w:r></w:p>"#,
        );
        let blocks = DocxBlockExtractor.extract_blocks(&docx(&xml, &[])).unwrap();
        assert_eq!(blocks[0].markup, "<strong>Lời giải</strong> tiếp");
    }

    #[test]
    fn test_tab_stops_and_math_runs() {
        let xml = body(
            r#"<w:tbl><w:tr>
                 <w:tc><w:p><w:r><w:t>A. 1</w:t></w:r><w:r><w:tab/><w:t>B. 2</w:t></w:r></w:p></w:tc>
                 <w:tc><w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="2835"/></w:tabs></w:pPr><w:r><w:t>C. 3</w:t></w:r></w:p></w:tc>
               </w:tr></w:tbl>
               <w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Tính</w:t></w:r><m:oMath><m:r><m:t>x+1</m:t></m:r></m:oMath></w:p>"#,
        );
        let blocks = DocxBlockExtractor.extract_blocks(&docx(&xml, &[])).unwrap();
        assert_eq!(blocks[0].plain_text, "A. 1 B. 2 C. 3");
        assert_eq!(blocks[1].markup, "<strong>Tính</strong>x+1");
    }

    #[test]
    fn test_inequalities_survive_into_answer_detection() {
        let xml = body(
            r#"<w:p><w:r><w:t>Câu 1: So sánh</w:t></w:r></w:p>
               <w:p><w:r><w:t>A. 1 B. 2 C. 3 D. 4</w:t></w:r></w:p>
               <w:p><w:r><w:t>Lời giải</w:t></w:r></w:p>
               <w:p><w:r><w:t>Ta có a &lt; b, chọn C vì c &gt; 0.</w:t></w:r></w:p>"#,
        );
        let blocks = DocxBlockExtractor.extract_blocks(&docx(&xml, &[])).unwrap();
        assert_eq!(blocks[3].markup, "Ta có a < b, chọn C vì c > 0.");

        let draft = crate::services::parse_exam(&blocks, "so-sanh.docx", &Default::default());
        assert_eq!(draft.answers[0].correct_option_id, "C");
    }

    #[test]
    fn test_table_is_one_block() {
        let xml = body(
            r#"<w:tbl><w:tr>
                 <w:tc><w:p><w:r><w:t>A. 1</w:t></w:r></w:p></w:tc>
                 <w:tc><w:p><w:r><w:t>B. 2</w:t></w:r></w:p></w:tc>
               </w:tr><w:tr>
                 <w:tc><w:p><w:r><w:t>C. 3</w:t></w:r></w:p></w:tc>
                 <w:tc><w:p><w:r><w:t>D. 4</w:t></w:r></w:p></w:tc>
               </w:tr></w:tbl>"#,
        );
        let blocks = DocxBlockExtractor.extract_blocks(&docx(&xml, &[])).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].plain_text, "A. 1 B. 2 C. 3 D. 4");
    }

    #[test]
    fn test_embedded_image() {
        let xml = body(
            r#"<w:p><w:r><w:drawing><a:graphic><a:blip r:embed="rId5"/></a:graphic></w:drawing></w:r></w:p>"#,
        );
        let data = docx(&xml, &[(constants::DOCX_RELS_PART, RELS.as_bytes()), ("word/media/image1.png", b"abc")]);
        let blocks = DocxBlockExtractor.extract_blocks(&data).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].has_image);
        assert!(blocks[0].plain_text.is_empty());
        assert_eq!(blocks[0].markup, r#"<img src="data:image/png;base64,YWJj" />"#);
    }

    #[test]
    fn test_unreadable_sources() {
        let err = DocxBlockExtractor.extract_blocks(b"definitely not a zip").unwrap_err();
        assert!(err.0.contains("not a valid ZIP"));

        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"hello").unwrap();
            zip.finish().unwrap();
        }
        let err = DocxBlockExtractor.extract_blocks(&buf.into_inner()).unwrap_err();
        assert!(err.0.contains("missing word/document.xml"));
    }

    #[tokio::test]
    async fn test_json_extractor() {
        let json = r#"[{"plainText":"  Câu 1: x ","markup":"Câu 1: x"},{"plainText":"","markup":"<img src=\"a.png\"/>"}]"#;
        let blocks = JsonBlockExtractor.extract(json.as_bytes()).await.unwrap();
        assert_eq!(blocks[0].plain_text, "Câu 1: x");
        assert!(blocks[1].has_image);

        assert!(JsonBlockExtractor.extract(b"{oops").await.is_err());
    }

    #[test]
    fn test_extractor_for() {
        assert_eq!(extractor_for("de-thi.DOCX").extractor_id(), "docx");
        assert_eq!(extractor_for("blocks.json").extractor_id(), "json");
    }
}
