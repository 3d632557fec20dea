//! Button feedback sounds

/// Sounds played by overlay controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Click,
    Scrub,
}

/// Injected sound service
pub trait SoundEffects: Send + Sync {
    fn play(&self, sound: Sound);
}

/// Plays nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl SoundEffects for Silent {
    fn play(&self, _sound: Sound) {}
}
