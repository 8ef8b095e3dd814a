//! Callback-data codec and inline keyboards.
//!
//! Callback data travels as short `kind:value` strings (Telegram caps it at
//! 64 bytes), e.g. `menu:images`, `src:pdf`, `tgt:docx`, `cv:png`, `lang:ru`.

use std::fmt;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::i18n::{fill, Lang, Texts};
use crate::convert::{allowed_targets, Format, FormatFamily};

/// Screens reachable from the menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Main,
    Family(FormatFamily),
    Direct,
    Language,
}

/// A decoded button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Menu(Menu),
    /// Source chosen from a category menu.
    Source(Format),
    /// Target chosen after picking a source from the menus.
    Target(Format),
    /// Target chosen for the pending uploaded file.
    Convert(Format),
    Lang(Lang),
    Back,
}

fn family_code(family: FormatFamily) -> &'static str {
    match family {
        FormatFamily::Document => "documents",
        FormatFamily::Image => "images",
        FormatFamily::Audio => "audio",
        FormatFamily::Video => "video",
    }
}

impl Callback {
    pub fn parse(data: &str) -> Option<Callback> {
        if data == "back" {
            return Some(Callback::Back);
        }
        let (kind, value) = data.split_once(':')?;
        match kind {
            "menu" => {
                let menu = match value {
                    "main" => Menu::Main,
                    "documents" => Menu::Family(FormatFamily::Document),
                    "images" => Menu::Family(FormatFamily::Image),
                    "audio" => Menu::Family(FormatFamily::Audio),
                    "video" => Menu::Family(FormatFamily::Video),
                    "direct" => Menu::Direct,
                    "language" => Menu::Language,
                    _ => return None,
                };
                Some(Callback::Menu(menu))
            }
            "src" => Format::from_extension(value).map(Callback::Source),
            "tgt" => Format::from_extension(value).map(Callback::Target),
            "cv" => Format::from_extension(value).map(Callback::Convert),
            "lang" => Lang::from_code(value).map(Callback::Lang),
            _ => None,
        }
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Menu(Menu::Main) => f.write_str("menu:main"),
            Callback::Menu(Menu::Family(family)) => write!(f, "menu:{}", family_code(*family)),
            Callback::Menu(Menu::Direct) => f.write_str("menu:direct"),
            Callback::Menu(Menu::Language) => f.write_str("menu:language"),
            Callback::Source(format) => write!(f, "src:{format}"),
            Callback::Target(format) => write!(f, "tgt:{format}"),
            Callback::Convert(format) => write!(f, "cv:{format}"),
            Callback::Lang(lang) => write!(f, "lang:{}", lang.code()),
            Callback::Back => f.write_str("back"),
        }
    }
}

fn button(label: impl Into<String>, callback: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, callback.to_string())
}

pub fn main_menu(t: &Texts) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(t.documents, Callback::Menu(Menu::Family(FormatFamily::Document))),
            button(t.images, Callback::Menu(Menu::Family(FormatFamily::Image))),
        ],
        vec![
            button(t.audio, Callback::Menu(Menu::Family(FormatFamily::Audio))),
            button(t.video, Callback::Menu(Menu::Family(FormatFamily::Video))),
        ],
        vec![button(t.send_direct, Callback::Menu(Menu::Direct))],
        vec![button(t.language, Callback::Menu(Menu::Language))],
    ])
}

/// One row per source in the family, e.g. `PDF → DOCX/TXT`.
pub fn family_menu(t: &Texts, family: FormatFamily) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Format::sources_in(family)
        .into_iter()
        .map(|source| {
            let targets: Vec<&str> = allowed_targets(source).iter().map(|f| f.label()).collect();
            let label = format!("{} → {}", source.label(), targets.join("/"));
            vec![button(label, Callback::Source(source))]
        })
        .collect();
    rows.push(vec![button(t.back_menu, Callback::Back)]);
    InlineKeyboardMarkup::new(rows)
}

/// Targets for a menu-selected source. Back returns to the source's category.
pub fn target_menu(t: &Texts, source: Format) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = allowed_targets(source)
        .iter()
        .map(|&target| {
            let label = fill(t.convert_to, &[("target", target.label())]);
            vec![button(label, Callback::Target(target))]
        })
        .collect();
    rows.push(vec![button(t.back, Callback::Menu(Menu::Family(source.family())))]);
    InlineKeyboardMarkup::new(rows)
}

/// Targets for an uploaded file, two per row.
pub fn convert_menu(source: Format) -> InlineKeyboardMarkup {
    let rows = allowed_targets(source)
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&target| button(format!("→ {}", target.label()), Callback::Convert(target)))
                .collect()
        })
        .collect::<Vec<Vec<_>>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn back_menu(t: &Texts) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(t.back_menu, Callback::Back)]])
}

pub fn language_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        Lang::ALL
            .into_iter()
            .map(|lang| vec![button(lang.native_name(), Callback::Lang(lang))])
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_known_codes() {
        assert_eq!(Callback::parse("back"), Some(Callback::Back));
        assert_eq!(
            Callback::parse("menu:images"),
            Some(Callback::Menu(Menu::Family(FormatFamily::Image)))
        );
        assert_eq!(Callback::parse("src:pdf"), Some(Callback::Source(Format::Pdf)));
        assert_eq!(Callback::parse("tgt:docx"), Some(Callback::Target(Format::Docx)));
        assert_eq!(Callback::parse("cv:png"), Some(Callback::Convert(Format::Png)));
        assert_eq!(Callback::parse("lang:ru"), Some(Callback::Lang(Lang::Ru)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Callback::parse(""), None);
        assert_eq!(Callback::parse("menu:nope"), None);
        assert_eq!(Callback::parse("src:exe"), None);
        assert_eq!(Callback::parse("lang:fr"), None);
        assert_eq!(Callback::parse("convert_png"), None);
    }

    #[test]
    fn test_every_button_parses_and_fits() {
        let t = Lang::En.texts();
        let mut markups = vec![main_menu(t), back_menu(t), language_menu()];
        for family in [FormatFamily::Document, FormatFamily::Image, FormatFamily::Audio, FormatFamily::Video] {
            markups.push(family_menu(t, family));
        }
        for format in Format::ALL {
            markups.push(target_menu(t, format));
            markups.push(convert_menu(format));
        }

        for markup in &markups {
            for data in callback_data(markup) {
                assert!(data.len() <= 64, "{data} too long");
                let parsed = Callback::parse(&data).unwrap_or_else(|| panic!("{data} does not parse"));
                assert_eq!(parsed.to_string(), data);
            }
        }
    }

    #[test]
    fn test_family_menu_lists_sources() {
        let data = callback_data(&family_menu(Lang::En.texts(), FormatFamily::Document));
        assert_eq!(data, vec!["src:pdf", "src:docx", "src:txt", "back"]);
    }

    #[test]
    fn test_convert_menu_offers_allowed_targets() {
        let data = callback_data(&convert_menu(Format::Wav));
        assert_eq!(data, vec!["cv:mp3", "cv:ogg"]);
        assert!(callback_data(&convert_menu(Format::Jpg)).iter().all(|d| d != "cv:jpeg"));
    }
}
