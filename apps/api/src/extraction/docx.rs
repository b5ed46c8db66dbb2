use std::io::{Cursor, Read};

use super::ExtractError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Pulls the visible text out of a DOCX container.
///
/// Reads `word/document.xml`, keeps the contents of `<w:t>` runs, and turns
/// paragraph ends, breaks and tabs into whitespace.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Docx(format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    Ok(document_xml_to_text(&xml))
}

fn document_xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    let mut rest = xml;
    let mut in_text_run = false;

    while let Some(open) = rest.find('<') {
        if in_text_run {
            out.push_str(&decode_entities(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match name {
            "w:t" => in_text_run = !tag.ends_with('/'),
            "/w:t" => in_text_run = false,
            "/w:p" | "w:br" | "w:cr" => out.push('\n'),
            "w:tab" => out.push('\t'),
            _ => {}
        }
        rest = &rest[open + close + 1..];
    }

    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Named XML entities plus decimal (`#8217`) and hex (`#x2019`) references.
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file(DOCUMENT_PART, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_paragraphs_and_runs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Staff Engineer</w:t></w:r><w:r><w:t xml:space="preserve"> at Acme</w:t></w:r></w:p>
            <w:p><w:r><w:t>Cut p99 latency by 40%</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = document_xml_to_text(xml);
        assert_eq!(text, "Staff Engineer at Acme\nCut p99 latency by 40%\n");
    }

    #[test]
    fn test_entities_are_decoded() {
        let xml = "<w:p><w:r><w:t>R&amp;D &lt;lead&gt;</w:t></w:r></w:p>";
        assert_eq!(document_xml_to_text(xml), "R&D <lead>\n");
    }

    #[test]
    fn test_numeric_character_references_are_decoded() {
        let xml = "<w:p><w:r><w:t>Jane&#8217;s team &#x2014; R&amp;D &#X41;</w:t></w:r></w:p>";
        assert_eq!(document_xml_to_text(xml), "Jane\u{2019}s team \u{2014} R&D A\n");
    }

    #[test]
    fn test_unknown_or_broken_references_kept_verbatim() {
        assert_eq!(decode_entities("AT&T &bogus; &#xZZ; &#1114112;"), "AT&T &bogus; &#xZZ; &#1114112;");
        assert_eq!(decode_entities("tail &amp"), "tail &amp");
    }

    #[test]
    fn test_text_outside_runs_is_ignored() {
        let xml = "<w:p><w:rPr>junk</w:rPr><w:r><w:t>kept</w:t></w:r></w:p>";
        assert_eq!(document_xml_to_text(xml), "kept\n");
    }

    #[test]
    fn test_extract_from_zip_container() {
        let bytes = build_docx("<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t>World</w:t></w:r></w:p>");
        assert_eq!(extract_text(&bytes).unwrap(), "Hello\tWorld\n");
    }

    #[test]
    fn test_not_a_zip_is_docx_error() {
        assert!(matches!(
            extract_text(b"plain bytes"),
            Err(ExtractError::Docx(_))
        ));
    }
}
