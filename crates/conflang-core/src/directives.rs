/// Start page configuration directives.
///
/// ```text
/// weather-coords 59.91 10.75
/// link Rust\ Book https://doc.rust-lang.org/book/
/// background-savepath /home/me/Pictures/backgrounds
/// background-maxdim 1920
/// image-subreddit SkyPorn
/// nop this line does nothing
/// ```
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::LineError;
use crate::registry::Registry;

pub const DEFAULT_BACKGROUND_MAXDIM: u32 = 2500;
pub const DEFAULT_IMAGE_SUBREDDIT: &str = "EarthPorn";

pub const WEATHER_COORDS: &str = "weather-coords";
pub const LINK: &str = "link";
pub const BACKGROUND_SAVEPATH: &str = "background-savepath";
pub const BACKGROUND_MAXDIM: &str = "background-maxdim";
pub const IMAGE_SUBREDDIT: &str = "image-subreddit";

#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("{command} expects {expected} parameter(s), got {got}")]
    Arity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{command}: invalid value {value:?}: {reason}")]
    InvalidValue {
        command: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherCoords {
    pub lat: String,
    pub lon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// Everything a start page script can set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartpageSettings {
    /// Where to get the weather for. No weather is shown when unset.
    pub weather_coords: Option<WeatherCoords>,
    /// Links in the order they were declared.
    pub links: Vec<Link>,
    /// If set, background images can be saved here.
    pub background_savepath: Option<String>,
    pub background_maxdim: Option<u32>,
    pub image_subreddit: Option<String>,
}

impl StartpageSettings {
    /// Run `source` with the built-in and start page directives and return
    /// the resulting settings.
    pub fn from_script<R: Read>(source: R) -> Result<Self, LineError> {
        let settings = Arc::new(Mutex::new(Self::default()));
        let registry = directive_registry(Arc::clone(&settings));
        registry.run(source)?;

        let result = lock(&settings).clone();
        Ok(result)
    }

    pub fn background_maxdim(&self) -> u32 {
        self.background_maxdim.unwrap_or(DEFAULT_BACKGROUND_MAXDIM)
    }

    pub fn image_subreddit(&self) -> &str {
        self.image_subreddit
            .as_deref()
            .unwrap_or(DEFAULT_IMAGE_SUBREDDIT)
    }

    pub fn can_save_background(&self) -> bool {
        self.background_savepath
            .as_deref()
            .is_some_and(|p| !p.is_empty())
    }
}

/// A registry holding `nop` and every start page directive, writing into `settings`.
pub fn directive_registry(settings: Arc<Mutex<StartpageSettings>>) -> Registry {
    let mut registry = Registry::with_builtins();
    register_directives(&mut registry, settings);
    registry
}

/// Register the start page directives into `registry`.
pub fn register_directives(registry: &mut Registry, settings: Arc<Mutex<StartpageSettings>>) {
    let s = Arc::clone(&settings);
    registry.register(WEATHER_COORDS, move |params| {
        let [lat, lon] = expect_params::<2>(WEATHER_COORDS, params)?;
        lock(&s).weather_coords = Some(WeatherCoords {
            lat: lat.clone(),
            lon: lon.clone(),
        });
        Ok(())
    });

    let s = Arc::clone(&settings);
    registry.register(LINK, move |params| {
        let [title, url] = expect_params::<2>(LINK, params)?;
        lock(&s).links.push(Link {
            title: title.clone(),
            url: url.clone(),
        });
        Ok(())
    });

    let s = Arc::clone(&settings);
    registry.register(BACKGROUND_SAVEPATH, move |params| {
        let [path] = expect_params::<1>(BACKGROUND_SAVEPATH, params)?;
        lock(&s).background_savepath = Some(path.clone());
        Ok(())
    });

    let s = Arc::clone(&settings);
    registry.register(BACKGROUND_MAXDIM, move |params| {
        let [value] = expect_params::<1>(BACKGROUND_MAXDIM, params)?;
        let maxdim = parse_maxdim(value)?;
        lock(&s).background_maxdim = Some(maxdim);
        Ok(())
    });

    let s = settings;
    registry.register(IMAGE_SUBREDDIT, move |params| {
        let [name] = expect_params::<1>(IMAGE_SUBREDDIT, params)?;
        lock(&s).image_subreddit = Some(name.clone());
        Ok(())
    });
}

fn expect_params<'a, const N: usize>(
    command: &'static str,
    params: &'a [String],
) -> Result<&'a [String; N], DirectiveError> {
    params.try_into().map_err(|_| DirectiveError::Arity {
        command,
        expected: N,
        got: params.len(),
    })
}

fn parse_maxdim(value: &str) -> Result<u32, DirectiveError> {
    let invalid = |reason: String| DirectiveError::InvalidValue {
        command: BACKGROUND_MAXDIM,
        value: value.to_string(),
        reason,
    };

    match value.parse::<u32>() {
        Ok(0) => Err(invalid("must be positive".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(e.to_string())),
    }
}

// Handlers never run concurrently within a run, so a poisoned lock only
// means an earlier handler panicked; the data is still usable.
fn lock(settings: &Mutex<StartpageSettings>) -> MutexGuard<'_, StartpageSettings> {
    settings.lock().unwrap_or_else(PoisonError::into_inner)
}
