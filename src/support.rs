//! CATMA identifier, colour and timestamp helpers.
//!
//! These mirror the small free functions the original Python tooling used
//! throughout its reader/writer (`get_catma_uuid_as_str`, `get_uuid_from_catma_uuid_str`,
//! `gettimestamp`, `generate_random_color`), kept separate since they are
//! needed by the tagset, annotation and stand-off codec modules alike.

use time::format_description;
use uuid::Uuid;

use crate::range::Range;
use crate::CatmaError;

/// Renders a UUID the way CATMA writes it into TEI: `CATMA_` followed by the
/// uppercase canonical 8-4-4-4-12 form.
pub fn catma_uuid_string(id: &Uuid) -> String {
    format!("CATMA_{}", id.as_hyphenated().to_string().to_uppercase())
}

/// Parses a CATMA-prefixed UUID string back into a `Uuid`.
///
/// A `CATMA_` prefix is stripped if present; otherwise a two-character vendor
/// prefix (e.g. `T`, `D`, `C` for tagset/document/collection ids) is stripped
/// instead, matching `get_uuid_from_catma_uuid_str`.
pub fn uuid_from_catma_uuid_string(catma_uuid: &str) -> Result<Uuid, CatmaError> {
    let stripped = if let Some(rest) = catma_uuid.strip_prefix("CATMA_") {
        rest
    } else if catma_uuid.len() > 2 {
        &catma_uuid[2..]
    } else {
        catma_uuid
    };
    Uuid::parse_str(stripped).map_err(CatmaError::from)
}

/// Returns the current time formatted as a CATMA version timestamp:
/// `%Y-%m-%dT%H:%M:%S.<3-digit-ms><±HHMM>` (milliseconds, timezone offset
/// without a colon).
pub fn timestamp() -> String {
    let format = format_description::parse(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour \
            sign:mandatory][offset_minute]",
    )
    .expect("Failed to create timestamp format");
    time::OffsetDateTime::now_utc()
        .format(&format)
        .expect("Failed to format timestamp")
}

/// Encodes an RGB triplet into CATMA's 32-bit colour representation: high
/// byte reserved (set to `255`), then red in bits 16-23, green in 8-15, blue
/// in 0-7.
pub fn encode_color(red: u8, green: u8, blue: u8) -> i64 {
    ((255i64 & 0xFF) << 24) | ((red as i64) << 16) | ((green as i64) << 8) | (blue as i64)
}

/// Splits a CATMA colour integer back into its `(red, green, blue)`
/// components. The high (reserved) byte is ignored on read, since older
/// writers stored `0` there and current writers store `255`.
pub fn decode_color(color: i64) -> (u8, u8, u8) {
    let red = ((color >> 16) & 0xFF) as u8;
    let green = ((color >> 8) & 0xFF) as u8;
    let blue = (color & 0xFF) as u8;
    (red, green, blue)
}

/// Extracts the document id from a `<ptr>` target like
/// `catma://CATMA_0854DF2F-9527-428E-B753-84C0710AFDA5#char=42,48`.
pub fn document_id_from_target(target: &str) -> Option<&str> {
    let start = target.find("CATMA_")? + "CATMA_".len();
    let end = target.find('#')?;
    target.get(start..end)
}

/// Extracts the `[start, end)` range from a `<ptr>` target attribute, e.g.
/// `catma://CATMA_0854DF2F-9527-428E-B753-84C0710AFDA5#char=42,48`.
pub fn extract_range(target: &str) -> Result<Range, CatmaError> {
    let range_str = target
        .rfind('=')
        .map(|i| &target[i + 1..])
        .ok_or_else(|| CatmaError::PointerTargetInvalid(target.to_owned()))?;
    let mut offsets = range_str.split(',');
    let start = offsets
        .next()
        .ok_or_else(|| CatmaError::PointerTargetInvalid(target.to_owned()))?
        .parse::<usize>()?;
    let end = offsets
        .next()
        .ok_or_else(|| CatmaError::PointerTargetInvalid(target.to_owned()))?
        .parse::<usize>()?;
    Ok(Range::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_round_trips_through_catma_string() {
        let id = Uuid::new_v4();
        let catma_str = catma_uuid_string(&id);
        assert!(catma_str.starts_with("CATMA_"));
        assert_eq!(uuid_from_catma_uuid_string(&catma_str).unwrap(), id);
    }

    #[test]
    fn vendor_prefixed_uuid_strips_two_chars() {
        let id = Uuid::new_v4();
        let vendor_str = format!("TS{}", id.as_hyphenated());
        assert_eq!(uuid_from_catma_uuid_string(&vendor_str).unwrap(), id);
    }

    #[test]
    fn color_round_trips() {
        let encoded = encode_color(10, 20, 30);
        assert_eq!(decode_color(encoded), (10, 20, 30));
    }

    #[test]
    fn document_id_extracted_from_ptr_target() {
        let target = "catma://CATMA_0854DF2F-9527-428E-B753-84C0710AFDA5#char=42,48";
        assert_eq!(
            document_id_from_target(target),
            Some("0854DF2F-9527-428E-B753-84C0710AFDA5")
        );
    }

    #[test]
    fn range_extracted_from_ptr_target() {
        let target = "catma://CATMA_0854DF2F-9527-428E-B753-84C0710AFDA5#char=42,48";
        assert_eq!(extract_range(target).unwrap(), Range::new(42, 48));
    }
}
