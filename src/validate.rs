// SPDX-License-Identifier: MPL-2.0

//! Input checks that run before either backend is touched.

use crate::model::{
    CardPatch, DeckPatch, FolderPatch, NewCard, NewDeck, NewFolder, NewStudySession, NewTag,
    NewTheme, ThemePatch,
};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_NAME_LEN: usize = 120;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("invalid color regex")
});

static IMAGE_DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:image/[a-z0-9.+-]+(?:;[^,]*)?,").expect("invalid image data uri regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

type Result = std::result::Result<(), ValidationError>;

fn required(field: &'static str, value: &str) -> Result {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

fn name(field: &'static str, value: &str) -> Result {
    required(field, value)?;
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(field, "too long"));
    }
    Ok(())
}

fn color(field: &'static str, value: &str) -> Result {
    if !HEX_COLOR_RE.is_match(value) {
        return Err(ValidationError::new(field, "must be #rgb or #rrggbb"));
    }
    Ok(())
}

fn image(field: &'static str, value: Option<&str>) -> Result {
    match value {
        Some(uri) if !IMAGE_DATA_URI_RE.is_match(uri) => {
            Err(ValidationError::new(field, "must be an image data URI"))
        }
        _ => Ok(()),
    }
}

pub fn new_folder(input: &NewFolder) -> Result {
    name("name", &input.name)?;
    color("color", &input.color)
}

pub fn folder_patch(patch: &FolderPatch) -> Result {
    if let Some(n) = &patch.name {
        name("name", n)?;
    }
    if let Some(c) = &patch.color {
        color("color", c)?;
    }
    Ok(())
}

pub fn new_tag(input: &NewTag) -> Result {
    name("name", &input.name)?;
    color("color", &input.color)
}

pub fn new_card(input: &NewCard) -> Result {
    required("front", &input.front)?;
    required("back", &input.back)?;
    image("front_image", input.front_image.as_deref())?;
    image("back_image", input.back_image.as_deref())
}

pub fn card_patch(patch: &CardPatch) -> Result {
    if let Some(front) = &patch.front {
        required("front", front)?;
    }
    if let Some(back) = &patch.back {
        required("back", back)?;
    }
    if let Some(img) = &patch.front_image {
        image("front_image", img.as_deref())?;
    }
    if let Some(img) = &patch.back_image {
        image("back_image", img.as_deref())?;
    }
    Ok(())
}

pub fn new_deck(input: &NewDeck) -> Result {
    name("title", &input.title)?;
    input.cards.iter().try_for_each(new_card)
}

pub fn deck_patch(patch: &DeckPatch) -> Result {
    if let Some(title) = &patch.title {
        name("title", title)?;
    }
    Ok(())
}

pub fn new_session(input: &NewStudySession) -> Result {
    if input.cards_correct > input.cards_studied {
        return Err(ValidationError::new(
            "cards_correct",
            "cannot exceed cards_studied",
        ));
    }
    Ok(())
}

pub fn new_theme(input: &NewTheme) -> Result {
    name("name", &input.name)?;
    color("bg_color", &input.bg_color)?;
    color("surface_color", &input.surface_color)?;
    color("text_color", &input.text_color)?;
    color("secondary_text_color", &input.secondary_text_color)?;
    color("border_color", &input.border_color)?;
    color("accent_color", &input.accent_color)
}

pub fn theme_patch(patch: &ThemePatch) -> Result {
    if let Some(n) = &patch.name {
        name("name", n)?;
    }
    let colors = [
        ("bg_color", &patch.bg_color),
        ("surface_color", &patch.surface_color),
        ("text_color", &patch.text_color),
        ("secondary_text_color", &patch.secondary_text_color),
        ("border_color", &patch.border_color),
        ("accent_color", &patch.accent_color),
    ];
    for (field, value) in colors {
        if let Some(v) = value {
            color(field, v)?;
        }
    }
    Ok(())
}
