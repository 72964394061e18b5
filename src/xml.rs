//! XML Decoders (C2): three pure functions turning the three SVN wire
//! shapes into plain records. Ported from the teacher's `parse_svn_log`
//! / `parse_svn_list` using the same `roxmltree` navigation helpers.

use roxmltree::{Document, Node};

use crate::error::{ParseError, Result};
use crate::model::{Action, FileKind, LogEntry, RawPath};

fn get_attr(n: &Node, name: &str) -> Option<String> {
    n.attribute(name).map(|a| a.to_owned())
}

fn get_text(n: &Node) -> String {
    n.first_child()
        .and_then(|c| c.text())
        .unwrap_or("")
        .to_owned()
}

fn get_child<'a, 'i>(parent: &Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    parent.children().find(|c| c.has_tag_name(name))
}

fn get_child_text(parent: &Node, name: &str) -> Option<String> {
    get_child(parent, name).map(|n| get_text(&n))
}

fn get_child_text_or(parent: &Node, name: &str, default: &str) -> String {
    get_child_text(parent, name).unwrap_or_else(|| default.to_owned())
}

/// Minimal percent-decoder for the one field SVN re-encodes that this
/// crate needs decoded back: the `path` attribute of `<list>`.
pub fn decode_percent(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// `decodeLog`: parses a single `<log><logentry>…` document (the result
/// of `svn log --verbose --xml --limit 1`). Absence of a `<paths>`
/// block yields an empty `paths` vec — the caller treats this as the
/// spec's benign-empty-parse early exit.
pub fn decode_log(xml: &str) -> Result<LogEntry> {
    let doc = Document::parse(xml)
        .map_err(|e| ParseError::SvnProtocolError(format!("malformed log xml: {e}")))?;

    let entry_node = doc
        .descendants()
        .find(|n| n.has_tag_name("logentry"))
        .ok_or_else(|| ParseError::SvnProtocolError("no <logentry> in svn log output".into()))?;

    let revision = get_attr(&entry_node, "revision")
        .ok_or_else(|| ParseError::SvnProtocolError("logentry missing revision attribute".into()))?
        .parse::<i64>()
        .map_err(|_| ParseError::SvnProtocolError("logentry revision not an integer".into()))?;

    let author = get_child_text_or(&entry_node, "author", "n/a");
    let date = get_child_text(&entry_node, "date").and_then(|s| crate::util::parse_svn_date(&s));
    let message = get_child_text_or(&entry_node, "msg", "");

    let mut paths = Vec::new();
    if let Some(paths_node) = get_child(&entry_node, "paths") {
        for path_node in paths_node.children().filter(|n| n.has_tag_name("path")) {
            let action_code = get_attr(&path_node, "action").ok_or_else(|| {
                ParseError::SvnProtocolError("path element missing action attribute".into())
            })?;
            let copy_from_path = get_attr(&path_node, "copyfrom-path");
            let copy_from_rev = get_attr(&path_node, "copyfrom-rev")
                .map(|s| {
                    s.parse::<i64>().map_err(|_| {
                        ParseError::SvnProtocolError("copyfrom-rev not an integer".into())
                    })
                })
                .transpose()?;

            if copy_from_path.is_some() != copy_from_rev.is_some() {
                return Err(ParseError::SvnProtocolError(
                    "copyfrom-path and copyfrom-rev must be set together".into(),
                ));
            }

            paths.push(RawPath {
                path: get_text(&path_node),
                action: Action::from_svn_code(&action_code)?,
                copy_from_path,
                copy_from_rev,
            });
        }
    }

    Ok(LogEntry {
        revision,
        author,
        date,
        message,
        paths,
    })
}

/// `decodeFlatList`: one tuple per `<list>` element, in document order.
/// The `listUri` is `%`-decoded because SVN re-encodes it on the way
/// out.
pub fn decode_flat_list(xml: &str) -> Result<Vec<(String, Vec<(String, FileKind)>)>> {
    let doc = Document::parse(xml)
        .map_err(|e| ParseError::SvnProtocolError(format!("malformed list xml: {e}")))?;

    let mut lists = Vec::new();
    for list_node in doc.descendants().filter(|n| n.has_tag_name("list")) {
        let uri = get_attr(&list_node, "path")
            .map(|p| decode_percent(&p))
            .unwrap_or_default();

        let mut entries = Vec::new();
        for entry_node in list_node.children().filter(|n| n.has_tag_name("entry")) {
            let kind_attr = get_attr(&entry_node, "kind").ok_or_else(|| {
                ParseError::SvnProtocolError("entry element missing kind attribute".into())
            })?;
            let name = get_child_text_or(&entry_node, "name", "");
            entries.push((name, FileKind::from_svn_kind(&kind_attr)?));
        }
        lists.push((uri, entries));
    }
    Ok(lists)
}

/// `decodeRecursiveList`: entries from a single `<list>`, in document
/// order, with slash-separated relative paths as names.
pub fn decode_recursive_list(xml: &str) -> Result<Vec<(String, FileKind)>> {
    let doc = Document::parse(xml)
        .map_err(|e| ParseError::SvnProtocolError(format!("malformed list xml: {e}")))?;

    let list_node = doc
        .descendants()
        .find(|n| n.has_tag_name("list"))
        .ok_or_else(|| ParseError::SvnProtocolError("no <list> in svn ls -R output".into()))?;

    let mut entries = Vec::new();
    for entry_node in list_node.children().filter(|n| n.has_tag_name("entry")) {
        let kind_attr = get_attr(&entry_node, "kind").ok_or_else(|| {
            ParseError::SvnProtocolError("entry element missing kind attribute".into())
        })?;
        let name = get_child_text_or(&entry_node, "name", "");
        entries.push((name, FileKind::from_svn_kind(&kind_attr)?));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_log_reads_paths_with_copyfrom() {
        let xml = r#"<log><logentry revision="42">
            <author>alice</author><date>2026-01-01T00:00:00.000000Z</date>
            <paths>
                <path action="A" copyfrom-path="/a.txt" copyfrom-rev="41">/b.txt</path>
                <path action="D">/a.txt</path>
            </paths>
            <msg>move a to b</msg>
        </logentry></log>"#;
        let entry = decode_log(xml).unwrap();
        assert_eq!(entry.revision, 42);
        assert_eq!(entry.paths.len(), 2);
        assert_eq!(entry.paths[0].path, "/b.txt");
        assert_eq!(entry.paths[0].copy_from_path.as_deref(), Some("/a.txt"));
        assert_eq!(entry.paths[0].copy_from_rev, Some(41));
        assert_eq!(entry.paths[1].action, Action::Delete);
    }

    #[test]
    fn decode_log_with_no_paths_block_is_empty_not_an_error() {
        let xml = r#"<log><logentry revision="1">
            <author>bob</author><date>2026-01-01T00:00:00.000000Z</date>
            <msg>empty</msg>
        </logentry></log>"#;
        let entry = decode_log(xml).unwrap();
        assert!(entry.paths.is_empty());
    }

    #[test]
    fn decode_flat_list_preserves_order_and_decodes_uri() {
        let xml = r#"<lists>
            <list path="/trunk%2Flib"><entry kind="file"><name>a.c</name></entry></list>
            <list path="/trunk%2Fsrc"><entry kind="dir"><name>sub</name></entry></list>
        </lists>"#;
        let lists = decode_flat_list(xml).unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].0, "/trunk/lib");
        assert_eq!(lists[0].1[0], ("a.c".to_string(), FileKind::File));
        assert_eq!(lists[1].0, "/trunk/src");
        assert_eq!(lists[1].1[0], ("sub".to_string(), FileKind::Directory));
    }

    #[test]
    fn decode_recursive_list_returns_relative_paths() {
        let xml = r#"<lists><list path="/lib">
            <entry kind="file"><name>a.c</name></entry>
            <entry kind="dir"><name>sub</name></entry>
            <entry kind="file"><name>sub/b.c</name></entry>
        </list></lists>"#;
        let entries = decode_recursive_list(xml).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], ("sub/b.c".to_string(), FileKind::File));
    }

    #[test]
    fn unknown_kind_is_protocol_error() {
        let xml = r#"<lists><list path="/x"><entry kind="symlink"><name>a</name></entry></list></lists>"#;
        assert!(decode_flat_list(xml).is_err());
    }
}
