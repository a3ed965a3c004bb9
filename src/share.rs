use crate::errors::AppResult;
use crate::models::ShareableState;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

const FRAGMENT_PREFIX: &str = "share=";

/// Encodes a snapshot into a token that is safe after a `#` delimiter:
/// compact JSON, then URL-safe base64 with padding stripped.
pub fn encode(state: &ShareableState) -> AppResult<String> {
    let payload = serde_json::to_vec(state)?;
    Ok(URL_SAFE_NO_PAD.encode(payload))
}

/// Decodes a share token. Every failure mode (bad alphabet, truncated
/// payload, non-UTF8 bytes, missing `v`/`q`) means "no state", never an
/// error; callers fall back to defaults.
pub fn decode(token: &str) -> Option<ShareableState> {
    // Older encoders may emit padded tokens; padding is re-derived from
    // length by the engine, so stray `=` is stripped up front.
    let trimmed = token.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(trimmed).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    serde_json::from_str(&text).ok()
}

/// Extracts shared state from a URL fragment. Accepts the fragment with or
/// without its leading `#`; anything not starting with `share=` is treated
/// as no shared state.
pub fn state_from_fragment(fragment: &str) -> Option<ShareableState> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let token = fragment.strip_prefix(FRAGMENT_PREFIX)?;
    decode(token)
}

/// Builds the fragment (without `#`) carrying the given snapshot.
pub fn fragment_for(state: &ShareableState) -> AppResult<String> {
    Ok(format!("{FRAGMENT_PREFIX}{}", encode(state)?))
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, fragment_for, state_from_fragment};
    use crate::models::{ShareableState, ViewKind};

    fn state(query: &str) -> ShareableState {
        ShareableState::new(query)
    }

    #[test]
    fn round_trips_ascii_query() {
        let original = ShareableState {
            view_kind: Some(ViewKind::Bar),
            title: Some("Budget overview".to_string()),
            ..state("SELECT * FROM county_budget")
        };
        let token = encode(&original).expect("encode");
        assert_eq!(decode(&token), Some(original));
    }

    #[test]
    fn round_trips_unicode_and_url_reserved_text() {
        let original = state("SELECT '\u{201c}fran\u{e7}ais\u{201d}', 'a+b/c=d&e?f#g' FROM localit\u{e9}s");
        let token = encode(&original).expect("encode");
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
        assert_eq!(decode(&token), Some(original));
    }

    #[test]
    fn decode_rejects_garbage_without_panicking() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("not-base64!!"), None);
        assert_eq!(decode("####"), None);

        let token = encode(&state("x")).expect("encode");
        assert_eq!(decode(&format!("{token}corrupted")), None);
    }

    #[test]
    fn decode_requires_version_and_query() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let missing_query = URL_SAFE_NO_PAD.encode(br#"{"v":1}"#);
        assert_eq!(decode(&missing_query), None);

        let missing_version = URL_SAFE_NO_PAD.encode(br#"{"q":"SELECT 1"}"#);
        assert_eq!(decode(&missing_version), None);

        let non_numeric_version = URL_SAFE_NO_PAD.encode(br#"{"v":"1","q":"SELECT 1"}"#);
        assert_eq!(decode(&non_numeric_version), None);
    }

    #[test]
    fn decode_tolerates_unknown_keys_and_padding() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let extra = URL_SAFE_NO_PAD.encode(br#"{"v":1,"q":"SELECT 1","zz":[1,2]}"#);
        let decoded = decode(&extra).expect("extra keys are ignored, not fatal");
        assert_eq!(decoded.query, "SELECT 1");

        let padded = format!("{}==", URL_SAFE_NO_PAD.encode(br#"{"v":1,"q":"SELECT 1"}"#));
        assert!(decode(&padded).is_some());
    }

    #[test]
    fn empty_query_is_present_state_not_absent() {
        let token = encode(&state("")).expect("encode");
        let decoded = decode(&token).expect("empty query is still a state");
        assert_eq!(decoded.query, "");
    }

    #[test]
    fn fragment_protocol_round_trip() {
        let original = ShareableState {
            view_kind: Some(ViewKind::Scatter),
            ..state("SELECT 1")
        };
        let fragment = fragment_for(&original).expect("fragment");
        assert!(fragment.starts_with("share="));
        assert_eq!(state_from_fragment(&fragment), Some(original.clone()));
        assert_eq!(state_from_fragment(&format!("#{fragment}")), Some(original));
    }

    #[test]
    fn non_share_fragments_mean_no_state() {
        assert_eq!(state_from_fragment(""), None);
        assert_eq!(state_from_fragment("#section-2"), None);
        assert_eq!(state_from_fragment("#shared=abc"), None);
    }
}
