//! Playable URL resolution
//!
//! A signed URL from the server always wins. Without one, the playback id is
//! substituted into the streaming template. Episodes with neither have no
//! playable source: that is a distinct "not available" state, not an error.

use crate::api::Episode;

/// Placeholder replaced by the playback id in stream templates
pub const PLAYBACK_ID_PLACEHOLDER: &str = "{playback_id}";

/// Playable URI for `episode`, or `None` if it has no source
pub fn resolve_uri(episode: &Episode, template: &str) -> Option<String> {
    if let Some(url) = non_empty(episode.signed_playback_url.as_deref()) {
        return Some(url.to_string());
    }

    let playback_id = non_empty(episode.playback_id.as_deref())?;
    if !template.contains(PLAYBACK_ID_PLACEHOLDER) {
        tracing::warn!("Stream template {:?} has no {} placeholder", template, PLAYBACK_ID_PLACEHOLDER);
        return None;
    }
    Some(template.replace(PLAYBACK_ID_PLACEHOLDER, playback_id))
}

/// Blank values count as missing; others pass through untouched
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::episode::fixtures::episode;

    const TEMPLATE: &str = "https://stream.mux.com/{playback_id}.m3u8";

    #[test]
    fn signed_url_wins() {
        let mut ep = episode("a", 1);
        ep.signed_playback_url = Some("https://cdn.example/a.m3u8?token=t".to_string());
        assert_eq!(
            resolve_uri(&ep, TEMPLATE).as_deref(),
            Some("https://cdn.example/a.m3u8?token=t")
        );
    }

    #[test]
    fn signed_url_is_used_verbatim() {
        let mut ep = episode("a", 1);
        let signed = "https://cdn.example/a.m3u8?sig=ab%20cd \n";
        ep.signed_playback_url = Some(signed.to_string());
        assert_eq!(resolve_uri(&ep, TEMPLATE).as_deref(), Some(signed));
    }

    #[test]
    fn falls_back_to_template() {
        let mut ep = episode("a", 1);
        ep.signed_playback_url = Some("   ".to_string());
        assert_eq!(
            resolve_uri(&ep, TEMPLATE).as_deref(),
            Some("https://stream.mux.com/pb-a.m3u8")
        );
    }

    #[test]
    fn nothing_to_play() {
        let mut ep = episode("a", 1);
        ep.playback_id = Some(String::new());
        assert_eq!(resolve_uri(&ep, TEMPLATE), None);
        ep.playback_id = None;
        assert_eq!(resolve_uri(&ep, TEMPLATE), None);
    }

    #[test]
    fn template_without_placeholder_is_unusable() {
        assert_eq!(resolve_uri(&episode("a", 1), "https://fixed.example/x"), None);
    }
}
