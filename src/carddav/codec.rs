use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use vcard4::Vcard;

/// Parse a `text/vcard` body holding exactly one card.
///
/// Both 3.0 and 4.0 cards are accepted; serializing writes 4.0.
pub fn decode_contact(body: &[u8]) -> Result<Vcard> {
    let text = std::str::from_utf8(body).context("vCard body is not UTF-8")?;
    let mut cards = vcard4::parse(text)
        .map_err(|err| anyhow!(err))
        .context("parsing vCard data")?;
    match cards.len() {
        1 => Ok(cards.remove(0)),
        0 => Err(anyhow!("vCard body holds no card")),
        n => Err(anyhow!("vCard resource holds {n} cards, expected one")),
    }
}

pub fn encode_contact(card: &Vcard) -> Bytes {
    Bytes::from(card.to_string())
}
