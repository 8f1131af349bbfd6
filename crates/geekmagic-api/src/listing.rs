// Directory listing parser for `/filelist?dir=...`.
//
// The device renders an HTML table with anchors like
// `<a href='/image/1.gif'>`. Only single-quoted hrefs under the requested
// directory count.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static IMAGE_HREF: LazyLock<Regex> = LazyLock::new(|| href_pattern("/image"));
static GIF_HREF: LazyLock<Regex> = LazyLock::new(|| href_pattern("/gif"));

#[allow(clippy::expect_used)]
fn href_pattern(dir: &str) -> Regex {
    Regex::new(&format!("href='{}/([^']+)'", regex::escape(dir))).expect("static href pattern")
}

/// Image directories on the device's flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageDirectory {
    /// Full-screen photo-album images.
    Image,
    /// Small images shown by the weather themes (SmallTV only).
    Gif,
}

impl ImageDirectory {
    /// Device path without trailing slash, e.g. `/image`.
    pub fn path(self) -> &'static str {
        match self {
            Self::Image => "/image",
            Self::Gif => "/gif",
        }
    }

    /// Device path of a file in this directory.
    pub fn file_path(self, filename: &str) -> String {
        format!("{}/{filename}", self.path())
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Image => &IMAGE_HREF,
            Self::Gif => &GIF_HREF,
        }
    }
}

impl fmt::Display for ImageDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Extract filenames from a listing page, in document order.
pub fn parse_file_list(html: &str, dir: ImageDirectory) -> Vec<String> {
    dir.pattern()
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn filenames_come_back_in_document_order() {
        let html = "<table><tr><td><a href='/image/a.gif'>a.gif</a></td></tr>\
                    <tr><td><a href='/image/b.jpg'>b.jpg</a></td></tr></table>";
        assert_eq!(parse_file_list(html, ImageDirectory::Image), vec!["a.gif", "b.jpg"]);
    }

    #[test]
    fn other_directories_are_ignored() {
        let html = "<a href='/gif/sun.gif'>x</a><a href='/image/cat.jpg'>y</a>\
                    <a href=\"/image/double.jpg\">z</a>";
        assert_eq!(parse_file_list(html, ImageDirectory::Image), vec!["cat.jpg"]);
        assert_eq!(parse_file_list(html, ImageDirectory::Gif), vec!["sun.gif"]);
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_file_list("<html></html>", ImageDirectory::Image).is_empty());
    }

    #[test]
    fn paths_render_like_the_device() {
        assert_eq!(ImageDirectory::Gif.file_path("1.gif"), "/gif/1.gif");
        assert_eq!(ImageDirectory::Image.to_string(), "/image");
    }
}
