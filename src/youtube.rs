//! YouTube link recognition and an embeddable player page.
//!
//! Recognition is a substring heuristic, not URL validation: anything that
//! mentions `youtube.com` or `youtu.be` is treated as a YouTube link.

use log::{debug, error};

const WATCH_MARKER: &str = "youtube.com/watch?v=";
const SHORT_MARKER: &str = "youtu.be/";
const EMBED_MARKER: &str = "youtube.com/embed/";

const EMBED_BASE: &str = "https://www.youtube.com/embed/";
const PLAYER_PARAMS: &str = "rel=0&autoplay=1&playsinline=1";

pub fn is_youtube_url(url: Option<&str>) -> bool {
    match url {
        Some(url) => url.contains("youtube.com") || url.contains("youtu.be"),
        None => false,
    }
}

/// Pulls the video id out of a watch, short or embed link.
///
/// Shapes are tried in that order. The id is what follows the marker up to the
/// next `&` (watch links) or `?` (short and embed links). A link whose id is
/// empty, such as `watch?v=&t=1`, yields `None` rather than `Some("")`.
pub fn extract_video_id(url: Option<&str>) -> Option<String> {
    let url = url?;

    let extracted = if url.contains(WATCH_MARKER) {
        segment_after(url, WATCH_MARKER, '&')
    } else if url.contains(SHORT_MARKER) {
        segment_after(url, SHORT_MARKER, '?')
    } else if url.contains(EMBED_MARKER) {
        segment_after(url, EMBED_MARKER, '?')
    } else {
        debug!("Not a recognised YouTube link: {}", url);
        return None;
    };

    if extracted.is_none() {
        error!("Error extracting YouTube video ID from: {}", url);
    }
    extracted
}

// Text between the first and second occurrence of `marker`, cut at `terminator`.
fn segment_after(url: &str, marker: &str, terminator: char) -> Option<String> {
    let rest = url.split(marker).nth(1)?;
    let id = rest.split(terminator).next()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

pub fn embed_url(video_id: &str) -> String {
    format!("{}{}?{}", EMBED_BASE, video_id, PLAYER_PARAMS)
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Self-contained HTML page playing `video_id` in a 16:9 container.
pub fn render_embed(video_id: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>");
    html.push_str("<html>");
    html.push_str("<head>");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no\">");
    html.push_str("<style>");
    html.push_str("body { margin: 0; padding: 0; background-color: #000; }");
    html.push_str(".video-container { position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden; }");
    html.push_str(".video-container iframe { position: absolute; top: 0; left: 0; width: 100%; height: 100%; }");
    html.push_str("</style>");
    html.push_str("</head>");
    html.push_str("<body>");
    html.push_str("<div class=\"video-container\">");
    html.push_str(&format!(
        "<iframe width=\"100%\" height=\"100%\" src=\"{}\" frameborder=\"0\" allowfullscreen></iframe>",
        embed_url(video_id)
    ));
    html.push_str("</div>");
    html.push_str("</body>");
    html.push_str("</html>");
    html
}

/// Rendering settings a player surface needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WebSettings {
    pub javascript_enabled: bool,
    pub dom_storage_enabled: bool,
    pub load_with_overview_mode: bool,
    pub use_wide_view_port: bool,
}

impl WebSettings {
    pub const PLAYER: WebSettings = WebSettings {
        javascript_enabled: true,
        dom_storage_enabled: true,
        load_with_overview_mode: true,
        use_wide_view_port: true,
    };
}

/// Anything that can render an HTML document.
pub trait WebSurface {
    fn set_visible(&mut self, visible: bool);
    fn apply_settings(&mut self, settings: WebSettings);
    fn load_html(&mut self, html: &str, mime_type: &str, encoding: &str);
}

/// The native video surface the web player replaces.
pub trait VideoSurface {
    fn hide(&mut self);
}

/// Shows the YouTube player for `url` on `view`.
///
/// Returns false when there is no view or URL (nothing is touched), or when no
/// video id could be extracted (the view has already been prepared by then).
pub fn load_youtube_video(
    view: Option<&mut dyn WebSurface>,
    fallback: Option<&mut dyn VideoSurface>,
    url: Option<&str>,
) -> bool {
    let (view, url) = match (view, url) {
        (Some(view), Some(url)) => (view, url),
        _ => {
            error!("WebView or URL is null");
            return false;
        }
    };

    if let Some(fallback) = fallback {
        fallback.hide();
    }
    view.set_visible(true);
    view.apply_settings(WebSettings::PLAYER);

    let video_id = match extract_video_id(Some(url)) {
        Some(id) => id,
        None => {
            error!("Could not extract YouTube video ID from: {}", url);
            return false;
        }
    };

    view.load_html(&render_embed(&video_id), "text/html", "UTF-8");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingView {
        visible: bool,
        settings: WebSettings,
        loaded: Option<(String, String, String)>,
    }

    impl WebSurface for RecordingView {
        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }
        fn apply_settings(&mut self, settings: WebSettings) {
            self.settings = settings;
        }
        fn load_html(&mut self, html: &str, mime_type: &str, encoding: &str) {
            self.loaded = Some((html.to_string(), mime_type.to_string(), encoding.to_string()));
        }
    }

    #[derive(Default)]
    struct Fallback {
        hidden: bool,
    }

    impl VideoSurface for Fallback {
        fn hide(&mut self) {
            self.hidden = true;
        }
    }

    #[test]
    fn recognises_youtube_hosts_by_substring() {
        assert!(is_youtube_url(Some("https://www.youtube.com/watch?v=abc")));
        assert!(is_youtube_url(Some("https://youtu.be/abc")));
        assert!(is_youtube_url(Some("https://example.com/?ref=youtube.com")));
        assert!(!is_youtube_url(Some("https://vimeo.com/123")));
        assert!(!is_youtube_url(None));
    }

    #[test]
    fn watch_links_end_at_ampersand() {
        assert_eq!(
            extract_video_id(Some("https://www.youtube.com/watch?v=kFYgLjdSkXE&t=42s")),
            Some("kFYgLjdSkXE".to_string())
        );
        assert_eq!(
            extract_video_id(Some("https://youtube.com/watch?v=kFYgLjdSkXE")),
            Some("kFYgLjdSkXE".to_string())
        );
    }

    #[test]
    fn short_and_embed_links_end_at_question_mark() {
        assert_eq!(
            extract_video_id(Some("https://youtu.be/dQw4w9WgXcQ?si=share")),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id(Some("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0")),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn watch_shape_wins_over_later_shapes() {
        let url = "https://www.youtube.com/watch?v=first&next=https://youtu.be/second";
        assert_eq!(extract_video_id(Some(url)), Some("first".to_string()));
    }

    #[test]
    fn unrecognised_links_yield_nothing() {
        assert_eq!(extract_video_id(None), None);
        assert_eq!(extract_video_id(Some("https://www.youtube.com/channel/xyz")), None);
    }

    #[test]
    fn empty_id_is_none_not_an_empty_string() {
        assert_eq!(extract_video_id(Some("https://youtu.be/")), None);
        assert_eq!(extract_video_id(Some("https://youtu.be/?t=5")), None);
        assert_eq!(extract_video_id(Some("https://www.youtube.com/watch?v=&t=1")), None);
        assert_eq!(extract_video_id(Some("https://www.youtube.com/embed/?rel=0")), None);
    }

    #[test]
    fn embed_page_points_at_the_player_endpoint() {
        let html = render_embed("abc123");
        assert!(html.contains("embed/abc123?rel=0&autoplay=1&playsinline=1"));
        assert!(html.contains("padding-bottom: 56.25%"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn loads_player_and_hides_fallback() {
        let mut view = RecordingView::default();
        let mut fallback = Fallback::default();

        let loaded = load_youtube_video(
            Some(&mut view),
            Some(&mut fallback),
            Some("https://youtu.be/abc123"),
        );

        assert!(loaded);
        assert!(fallback.hidden);
        assert!(view.visible);
        assert_eq!(view.settings, WebSettings::PLAYER);
        let (html, mime, encoding) = view.loaded.unwrap();
        assert_eq!(html, render_embed("abc123"));
        assert_eq!(mime, "text/html");
        assert_eq!(encoding, "UTF-8");
    }

    #[test]
    fn missing_view_or_url_touches_nothing() {
        let mut view = RecordingView::default();
        let mut fallback = Fallback::default();

        assert!(!load_youtube_video(None, Some(&mut fallback), Some("https://youtu.be/a")));
        assert!(!fallback.hidden);

        assert!(!load_youtube_video(Some(&mut view), Some(&mut fallback), None));
        assert!(!view.visible);
        assert!(view.loaded.is_none());
    }

    #[test]
    fn unextractable_link_leaves_document_unloaded() {
        let mut view = RecordingView::default();
        let loaded = load_youtube_video(
            Some(&mut view),
            None,
            Some("https://www.youtube.com/playlist?list=PL1"),
        );
        assert!(!loaded);
        assert!(view.visible);
        assert!(view.loaded.is_none());
    }
}
