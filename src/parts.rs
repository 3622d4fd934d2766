//! Part extraction: flatten the body tree into decoded leaf parts

use tracing::warn;

use crate::decode::{
    Decoded, Degradation, decode_base64_body, decode_quoted_printable_body, decode_text,
};
use crate::envelope::{BodyNode, LeafNode, TransferEncoding};
use crate::error::{ParseError, Result};
use crate::types::{MessagePart, PartData};

/// Leaf parts in document order, plus any lossy decodes met on the way
#[derive(Debug, Clone, Default)]
pub struct ExtractedParts {
    pub parts: Vec<MessagePart>,
    pub degradations: Vec<Degradation>,
}

/// Walk the body tree depth-first and build one [`MessagePart`] per leaf.
///
/// A text part declaring more than one charset aborts the whole message with
/// [`ParseError::TooManyCharsets`]; every other decoding problem is absorbed.
pub fn extract_parts(root: &BodyNode) -> Result<ExtractedParts> {
    let mut extracted = ExtractedParts::default();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node {
            BodyNode::Leaf(leaf) => {
                let position = extracted.parts.len() + 1;
                let part = extract_leaf(leaf, position, &mut extracted.degradations)?;
                extracted.parts.push(part);
            }
            BodyNode::Multipart { children, .. } => {
                stack.extend(children.iter().rev());
            }
        }
    }

    Ok(extracted)
}

fn extract_leaf(
    leaf: &LeafNode,
    position: usize,
    degradations: &mut Vec<Degradation>,
) -> Result<MessagePart> {
    let location = || format!("part {position} ({})", leaf.content_type);
    let mut record = |degradation: Option<Degradation>| {
        if let Some(degradation) = degradation {
            warn!("Degraded part decode: {degradation}");
            degradations.push(degradation);
        }
    };

    let (bytes, degradation) = transfer_decode(leaf).located(location);
    record(degradation);

    if !leaf.is_text() {
        return Ok(MessagePart {
            content_type: leaf.content_type.clone(),
            filename: leaf.filename.clone(),
            size: leaf.body.len(),
            can_index: false,
            charset: None,
            data: PartData::Binary(bytes),
        });
    }

    if leaf.charsets.len() > 1 {
        return Err(ParseError::TooManyCharsets {
            content_type: leaf.content_type.clone(),
            charsets: leaf.charsets.clone(),
        });
    }

    let charset = leaf.charsets.first().cloned();
    let (text, degradation) = decode_text(&bytes, charset.as_deref()).located(location);
    record(degradation);

    Ok(MessagePart {
        content_type: leaf.content_type.clone(),
        filename: leaf.filename.clone(),
        size: leaf.body.len(),
        can_index: true,
        charset,
        data: PartData::Text(text),
    })
}

fn transfer_decode(leaf: &LeafNode) -> Decoded<Vec<u8>> {
    match leaf.transfer_encoding {
        TransferEncoding::Identity => Decoded::clean(leaf.body.clone()),
        TransferEncoding::Base64 => decode_base64_body(&leaf.body),
        TransferEncoding::QuotedPrintable => decode_quoted_printable_body(&leaf.body),
    }
}
