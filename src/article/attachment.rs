//! Attachments split out of multipart bodies

use crate::codec::codec;

/// A MIME part kept aside from the canonical body
///
/// `data` is still in its wire encoding (`content_encoding`); call
/// [`Attachment::materialize`] for the bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    /// File name from `Content-Disposition` or the `Content-Type` name parameter
    pub name: Option<String>,
    /// MIME type (e.g. `image/png`)
    pub content_type: String,
    /// `Content-Transfer-Encoding` (e.g. `base64`)
    pub content_encoding: String,
    /// Encoded payload, lines joined with `\r\n`
    pub data: String,
}

impl Attachment {
    /// Decode the payload through the codec registry
    ///
    /// # Errors
    ///
    /// Returns the codec's reason string when the encoding is unsupported
    /// or the payload is malformed.
    pub fn materialize(&self) -> std::result::Result<Vec<u8>, String> {
        codec(&self.content_encoding)?.decode(&self.data)
    }
}

/// An attachment with a unique display name and its decoded size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollatedAttachment {
    /// Unique name within the article
    pub name: String,
    /// Estimated decoded length, or the raw length when unsupported
    pub length: usize,
    /// Empty when the codec is supported, otherwise why it is not
    pub reason: String,
    /// The attachment itself
    pub attachment: Attachment,
}

fn generated_name(index: usize) -> String {
    format!("attachment-{}", index + 1)
}

/// Unique names for a list of attachments
///
/// Unnamed attachments, and every attachment whose name collides with
/// another, get a positional `attachment-N` name (1-based).
///
/// ```
/// use nntp_reader::{collate_attachment_names, Attachment};
///
/// let named = |n: &str| Attachment { name: Some(n.into()), ..Default::default() };
/// let names = collate_attachment_names(&[named("a.txt"), named("b.txt"), named("a.txt")]);
/// assert_eq!(names, ["attachment-1", "b.txt", "attachment-3"]);
/// ```
pub fn collate_attachment_names(attachments: &[Attachment]) -> Vec<String> {
    let mut names: Vec<String> = attachments
        .iter()
        .enumerate()
        .map(|(i, a)| match a.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => generated_name(i),
        })
        .collect();

    // Back to front; the original name of i is compared against every
    // earlier entry so that three-way collisions all get replaced.
    for i in (1..names.len()).rev() {
        let name = names[i].clone();
        for j in (0..i).rev() {
            if names[j] == name {
                names[i] = generated_name(i);
                names[j] = generated_name(j);
            }
        }
    }
    names
}

/// Collate attachments for display: unique names plus decoded size estimates
pub fn collate_attachments(attachments: &[Attachment]) -> Vec<CollatedAttachment> {
    collate_attachment_names(attachments)
        .into_iter()
        .zip(attachments)
        .map(|(name, attachment)| {
            let (length, reason) = match codec(&attachment.content_encoding) {
                Ok(c) => (c.estimate_decoded_len(&attachment.data), String::new()),
                Err(reason) => (attachment.data.len(), reason),
            };
            CollatedAttachment {
                name,
                length,
                reason,
                attachment: attachment.clone(),
            }
        })
        .collect()
}
