/// Screen fragments: fetched markup, validated and reduced to what the
/// kiosk shell needs (title, navigation targets, visible text).
use std::collections::HashMap;
use std::path::PathBuf;

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::opt,
    multi::many0,
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::error::LoadError;

/// Marker class every screen fragment must carry on some element
pub const SCREEN_CLASS: &str = "screen";

/// Host-side source of screen markup
pub trait FragmentSource {
    fn fetch_screen_fragment(&self, name: &str) -> Result<String, LoadError>;
}

impl<T: FragmentSource + ?Sized> FragmentSource for Box<T> {
    fn fetch_screen_fragment(&self, name: &str) -> Result<String, LoadError> {
        (**self).fetch_screen_fragment(name)
    }
}

/// Reads `<root>/<name>.html`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FragmentSource for DirectorySource {
    fn fetch_screen_fragment(&self, name: &str) -> Result<String, LoadError> {
        let path = self.root.join(format!("{name}.html"));
        std::fs::read_to_string(&path).map_err(|e| LoadError::FragmentUnavailable {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// In-memory screens, for bundled markup and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    screens: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, markup: &str) -> Self {
        self.insert(name, markup);
        self
    }

    pub fn insert(&mut self, name: &str, markup: &str) {
        self.screens.insert(name.to_string(), markup.to_string());
    }
}

impl FragmentSource for StaticSource {
    fn fetch_screen_fragment(&self, name: &str) -> Result<String, LoadError> {
        self.screens
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::FragmentUnavailable {
                name: name.to_string(),
                reason: "not found".to_string(),
            })
    }
}

/// A loaded screen. Owned by the navigator and cached for the app lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    name: String,
    markup: String,
    title: String,
    targets: Vec<String>,
    text: String,
    active: bool,
}

impl Fragment {
    /// Validate and index screen markup
    pub fn parse(name: &str, markup: &str, app_title: &str) -> Result<Self, LoadError> {
        let scan = scan_markup(markup);
        if !scan.has_screen {
            return Err(LoadError::MalformedFragment {
                name: name.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            markup: markup.to_string(),
            title: format!("{app_title} - {}", capitalize(name)),
            targets: scan.targets,
            text: scan.text,
            active: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Screens this one links to, in document order
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Visible text with tags stripped and whitespace collapsed
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Default)]
struct MarkupScan {
    has_screen: bool,
    targets: Vec<String>,
    text: String,
}

#[derive(Debug)]
struct Tag<'a> {
    name: &'a str,
    closing: bool,
    attrs: Vec<(&'a str, &'a str)>,
}

impl<'a> Tag<'a> {
    fn attr(&self, key: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| *v)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')
}

fn parse_tag(input: &str) -> IResult<&str, Tag<'_>> {
    let (input, _) = char('<')(input)?;
    let (input, closing) = opt(char('/'))(input)?;
    let (input, name) = take_while1(is_name_char)(input)?;
    let (input, attrs) = many0(preceded(multispace1, parse_attribute))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(char('/'))(input)?;
    let (input, _) = char('>')(input)?;
    Ok((
        input,
        Tag {
            name,
            closing: closing.is_some(),
            attrs,
        },
    ))
}

fn parse_attribute(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, key) = take_while1(is_name_char)(input)?;
    let (input, value) = opt(preceded(
        tuple((multispace0, char('='), multispace0)),
        parse_attr_value,
    ))(input)?;
    Ok((input, (key, value.unwrap_or(""))))
}

fn parse_attr_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        take_while1(|c: char| !c.is_whitespace() && c != '>' && c != '/'),
    ))(input)
}

/// Walk the markup once: find the screen marker, collect targets and text.
/// Anything that does not parse as a tag is kept as text.
fn scan_markup(markup: &str) -> MarkupScan {
    let mut scan = MarkupScan::default();
    let mut raw_text = String::new();
    let mut rest = markup;

    while let Some(pos) = rest.find('<') {
        raw_text.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        if let Some(comment) = candidate.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        match parse_tag(candidate) {
            Ok((after, tag)) => {
                raw_text.push(' ');
                rest = after;
                if tag.closing {
                    continue;
                }
                if tag
                    .attr("class")
                    .is_some_and(|class| class.split_whitespace().any(|c| c == SCREEN_CLASS))
                {
                    scan.has_screen = true;
                }
                if let Some(target) = tag.attr("data-target").filter(|t| !t.is_empty()) {
                    scan.targets.push(target.to_string());
                }
                if tag.name.eq_ignore_ascii_case("script") || tag.name.eq_ignore_ascii_case("style") {
                    let close = format!("</{}", tag.name);
                    rest = rest.find(&close).map_or("", |end| &rest[end..]);
                }
            }
            Err(_) => {
                raw_text.push('<');
                rest = &candidate[1..];
            }
        }
    }
    raw_text.push_str(rest);

    scan.text = decode_entities(&raw_text.split_whitespace().collect::<Vec<_>>().join(" "));
    scan
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = r#"
<section id="screen-home" class="screen active">
  <h1>Showcase</h1>
  <!-- <button data-target="hidden">Hidden</button> -->
  <div class="grid">
    <button class="card" data-target="stl">3D Model</button>
    <button class='card' data-target=settings>Settings</button>
    <button class="card" data-target="about" disabled>About &amp; Help</button>
  </div>
  <script>if (a < b) { document.querySelector('[data-target="nope"]'); }</script>
</section>
"#;

    #[test]
    fn test_parse_home_fragment() {
        let fragment = Fragment::parse("home", HOME, "Showcase").unwrap();
        assert_eq!(fragment.name(), "home");
        assert_eq!(fragment.title(), "Showcase - Home");
        assert_eq!(fragment.targets(), ["stl", "settings", "about"]);
        assert_eq!(fragment.text(), "Showcase 3D Model Settings About & Help");
        assert!(!fragment.is_active());
        assert_eq!(fragment.markup(), HOME);
    }

    #[test]
    fn test_missing_screen_class_is_malformed() {
        let err = Fragment::parse("stl", "<div class=\"screens\">x</div>", "Showcase").unwrap_err();
        assert!(matches!(err, LoadError::MalformedFragment { name } if name == "stl"));
        assert!(Fragment::parse("x", "plain text", "Showcase").is_err());
    }

    #[test]
    fn test_stray_angle_brackets_are_text() {
        let fragment = Fragment::parse("m", "<div class=screen>1 < 2 <br/> ok</div>", "App").unwrap();
        assert_eq!(fragment.text(), "1 < 2 ok");
        assert_eq!(fragment.title(), "App - M");
    }

    #[test]
    fn test_static_source() {
        let source = StaticSource::new().with("home", HOME);
        assert!(source.fetch_screen_fragment("home").is_ok());
        assert!(matches!(
            source.fetch_screen_fragment("nope"),
            Err(LoadError::FragmentUnavailable { .. })
        ));
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("about.html"), "<div class=\"screen\">About</div>").unwrap();
        let source = DirectorySource::new(dir.path());
        let markup = source.fetch_screen_fragment("about").unwrap();
        assert_eq!(Fragment::parse("about", &markup, "S").unwrap().text(), "About");
        assert!(source.fetch_screen_fragment("missing").is_err());
    }
}
