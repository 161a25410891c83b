//! TEI serialization of witnesses and alignments
//!
//! Read-only: both functions take records out of a store snapshot. Record ids
//! become `xml:id` values with a kind prefix (`wit_`, `sec_`, `tok_`, `zone_`)
//! so numeric or punctuated ids still form valid XML names.

use crate::alignment::{AlignedToken, Alignment};
use epe_common::{Annotation, Section, Witness};
use serde_json::Value;
use std::borrow::Cow;

const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";

/// Escape text and attribute content
pub fn escape_xml(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// `prefix` + `raw`, with characters outside XML name syntax replaced by `_`
pub fn xml_name(prefix: &str, raw: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + raw.len());
    name.push_str(prefix);
    name.extend(raw.chars().map(|c| {
        if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
            c
        } else {
            '_'
        }
    }));
    name
}

fn witness_ref(witness: &Witness) -> String {
    xml_name("wit_", &witness.id)
}

fn section_ref(witness: &Witness, section: &Section) -> String {
    xml_name("sec_", &format!("{}_{}", witness.id, section.id))
}

fn token_ref(token_id: &str) -> String {
    xml_name("tok_", token_id)
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(line);
    out.push('\n');
}

fn header(out: &mut String, title: &str, source_lines: &[String]) {
    push_line(out, 0, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    push_line(out, 0, &format!("<TEI xmlns=\"{}\">", TEI_NS));
    push_line(out, 1, "<teiHeader>");
    push_line(out, 2, "<fileDesc>");
    push_line(
        out,
        3,
        &format!("<titleStmt><title>{}</title></titleStmt>", escape_xml(title)),
    );
    push_line(
        out,
        3,
        "<publicationStmt><p>Generated by the EPE reading environment</p></publicationStmt>",
    );
    push_line(out, 3, "<sourceDesc>");
    for line in source_lines {
        push_line(out, 4, line);
    }
    push_line(out, 3, "</sourceDesc>");
    push_line(out, 2, "</fileDesc>");
    push_line(out, 1, "</teiHeader>");
}

fn metadata_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `<facsimile>` with one zone per token that carries a bounding box
fn facsimile(out: &mut String, witness: &Witness) -> bool {
    let zoned: Vec<(&Section, Vec<String>)> = witness
        .sections()
        .iter()
        .map(|section| {
            let zones: Vec<String> = section
                .tokens()
                .iter()
                .filter_map(|token| {
                    token.bbox().map(|b| {
                        format!(
                            "<zone xml:id=\"{}\" ulx=\"{}\" uly=\"{}\" lrx=\"{}\" lry=\"{}\"/>",
                            xml_name("zone_", &token.id),
                            b.x,
                            b.y,
                            b.x + b.width,
                            b.y + b.height
                        )
                    })
                })
                .collect();
            (section, zones)
        })
        .filter(|(_, zones)| !zones.is_empty())
        .collect();

    if zoned.is_empty() {
        return false;
    }
    push_line(out, 1, "<facsimile>");
    for (section, zones) in zoned {
        push_line(
            out,
            2,
            &format!(
                "<surface n=\"{}\">",
                escape_xml(&section.id.to_string())
            ),
        );
        for zone in zones {
            push_line(out, 3, &zone);
        }
        push_line(out, 2, "</surface>");
    }
    push_line(out, 1, "</facsimile>");
    true
}

/// One witness as TEI, tokens as `<w>` and annotations as `<note>`
pub fn witness_tei(witness: &Witness, annotations: &[&Annotation]) -> String {
    let mut source = Vec::new();
    if let Some(siglum) = witness.siglum() {
        source.push(format!(
            "<msDesc><msIdentifier><idno type=\"siglum\">{}</idno></msIdentifier></msDesc>",
            escape_xml(siglum)
        ));
    }
    if let Some(metadata) = witness.metadata().filter(|m| !m.is_empty()) {
        source.push("<list type=\"metadata\">".to_string());
        for (key, value) in metadata {
            source.push(format!(
                "  <item n=\"{}\">{}</item>",
                escape_xml(key),
                escape_xml(&metadata_text(value))
            ));
        }
        source.push("</list>".to_string());
    }
    if source.is_empty() {
        source.push(format!("<p>{}</p>", escape_xml(&witness.label)));
    }

    let mut out = String::new();
    header(&mut out, &witness.label, &source);
    let has_zones = facsimile(&mut out, witness);

    push_line(&mut out, 1, "<text>");
    push_line(&mut out, 2, "<body>");
    push_line(
        &mut out,
        3,
        &format!("<div type=\"witness\" xml:id=\"{}\">", witness_ref(witness)),
    );

    for section in witness.sections() {
        let kind = section.kind().filter(|k| !k.is_empty()).unwrap_or("section");
        let n = section
            .order_no()
            .map(|n| n.to_string())
            .unwrap_or_else(|| section.id.to_string());
        push_line(
            &mut out,
            4,
            &format!(
                "<div type=\"{}\" n=\"{}\" xml:id=\"{}\">",
                escape_xml(kind),
                escape_xml(&n),
                section_ref(witness, section)
            ),
        );
        if kind == "page" {
            push_line(&mut out, 5, &format!("<pb n=\"{}\"/>", escape_xml(&n)));
        }

        let words: Vec<String> = section
            .tokens()
            .iter()
            .map(|token| {
                let n = token.position().map(|p| format!(" n=\"{}\"", p)).unwrap_or_default();
                let facs = if has_zones && token.bbox().is_some() {
                    format!(" facs=\"#{}\"", xml_name("zone_", &token.id))
                } else {
                    String::new()
                };
                format!(
                    "<w xml:id=\"{}\"{}{}>{}</w>",
                    token_ref(&token.id),
                    n,
                    facs,
                    escape_xml(&token.text)
                )
            })
            .collect();
        push_line(&mut out, 5, &format!("<p>{}</p>", words.join(" ")));
        push_line(&mut out, 4, "</div>");
    }

    if !annotations.is_empty() {
        push_line(&mut out, 4, "<div type=\"annotations\">");
        for annotation in annotations {
            let n = annotation.id.map(|id| id.to_string()).unwrap_or_default();
            push_line(
                &mut out,
                5,
                &format!(
                    "<note n=\"{}\" target=\"#{}\" when=\"{}\">{}</note>",
                    n,
                    token_ref(&annotation.token_id),
                    escape_xml(&annotation.timestamp),
                    escape_xml(&annotation.annotation)
                ),
            );
        }
        push_line(&mut out, 4, "</div>");
    }

    push_line(&mut out, 3, "</div>");
    push_line(&mut out, 2, "</body>");
    push_line(&mut out, 1, "</text>");
    push_line(&mut out, 0, "</TEI>");
    out
}

fn reading(token: &AlignedToken) -> String {
    match token {
        AlignedToken::Token(t) => escape_xml(&t.text).into_owned(),
        AlignedToken::Placeholder => String::new(),
    }
}

/// Parallel-segmentation apparatus: one `<app>` per variant row
pub fn apparatus_tei(base: &Witness, other: &Witness, alignment: &Alignment) -> String {
    let mut source = vec!["<listWit>".to_string()];
    for witness in [base, other] {
        let entry = format!(
            "  <witness xml:id=\"{}\">{}</witness>",
            witness_ref(witness),
            escape_xml(&witness.label)
        );
        if !source.contains(&entry) {
            source.push(entry);
        }
    }
    source.push("</listWit>".to_string());

    let mut out = String::new();
    header(
        &mut out,
        &format!("Collation of {} and {}", base.label, other.label),
        &source,
    );
    push_line(&mut out, 1, "<text>");
    push_line(&mut out, 2, "<body>");
    push_line(&mut out, 3, "<div type=\"apparatus\">");

    for pair in alignment.alignments.iter().filter(|p| p.variant) {
        push_line(&mut out, 4, &format!("<app n=\"{}\">", pair.position));
        push_line(
            &mut out,
            5,
            &format!("<lem wit=\"#{}\">{}</lem>", witness_ref(base), reading(&pair.base)),
        );
        push_line(
            &mut out,
            5,
            &format!(
                "<rdg wit=\"#{}\">{}</rdg>",
                witness_ref(other),
                reading(&pair.witness)
            ),
        );
        push_line(&mut out, 4, "</app>");
    }

    push_line(&mut out, 3, "</div>");
    push_line(&mut out, 2, "</body>");
    push_line(&mut out, 1, "</text>");
    push_line(&mut out, 0, "</TEI>");
    out
}
