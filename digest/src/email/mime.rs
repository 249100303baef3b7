use google_gmail1::api::MessagePart;

/// Body structure of a message, reduced to what text extraction needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePart {
    Text(String),
    Html(String),
    Multipart(Vec<MimePart>),
    /// Attachments, images and anything else without readable text
    Other,
}

impl MimePart {
    /// Convert a gmail payload (format=full) into a tagged part tree
    pub fn from_gmail_part(part: &MessagePart) -> Self {
        let mime_type = part
            .mime_type
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if is_attachment(part) {
            return MimePart::Other;
        }

        match mime_type.as_str() {
            "text/plain" => MimePart::Text(decode_body_data(part)),
            "text/html" => MimePart::Html(decode_body_data(part)),
            _ => match &part.parts {
                // multipart/* and message/rfc822 carry children
                Some(children) if !children.is_empty() => {
                    MimePart::Multipart(children.iter().map(Self::from_gmail_part).collect())
                }
                _ => MimePart::Other,
            },
        }
    }

    /// Depth-first visit of every leaf, in document order
    pub fn leaves(&self) -> Vec<&MimePart> {
        let mut out = vec![];
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a MimePart>) {
        match self {
            MimePart::Multipart(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            leaf => out.push(leaf),
        }
    }
}

fn is_attachment(part: &MessagePart) -> bool {
    part.filename.as_deref().is_some_and(|f| !f.is_empty())
}

/// The google_gmail1 crate already decodes base64url, so data is raw bytes
fn decode_body_data(part: &MessagePart) -> String {
    part.body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}
