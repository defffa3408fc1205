//! Calendar, weather, and ecosystem — the shared world systems.
//!
//! Weather is a pure function of the season, the world's volatility, and two
//! uniform rolls in [0, 1). Callers own the RNG, so a seeded generator makes
//! the whole sequence reproducible.

use serde::{Deserialize, Serialize};

use crate::common::unit;

pub const DAYS_PER_YEAR: u32 = 360;
const DAYS_PER_SEASON: u32 = DAYS_PER_YEAR / 4;

/// Temperatures (°C) between which an agent feels no thermal stress.
const COMFORT_BAND: (f32, f32) = (12.0, 26.0);
/// Degrees outside the band at which thermal satisfaction reaches zero.
const THERMAL_TOLERANCE: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Mean temperature in °C.
    pub fn base_temperature(self) -> f32 {
        match self {
            Self::Spring => 14.0,
            Self::Summer => 24.0,
            Self::Autumn => 12.0,
            Self::Winter => 0.0,
        }
    }

    pub fn is_growing(self) -> bool {
        matches!(self, Self::Spring | Self::Summer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    /// Day of the year, 0-based.
    pub day: u32,
    pub year: u32,
    pub days_per_turn: u32,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            day: 0,
            year: 1,
            days_per_turn: 1,
        }
    }
}

impl Calendar {
    pub fn season(&self) -> Season {
        match self.day / DAYS_PER_SEASON {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Move forward one turn's worth of days, rolling over years.
    pub fn advance(&mut self) {
        let total = self.day + self.days_per_turn;
        self.year += total / DAYS_PER_YEAR;
        self.day = total % DAYS_PER_YEAR;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherKind {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Storm,
    Heatwave,
}

impl WeatherKind {
    /// How hard this weather is on people outdoors, 0..1.
    pub fn severity(self) -> f32 {
        match self {
            Self::Clear => 0.0,
            Self::Cloudy => 0.1,
            Self::Rain => 0.3,
            Self::Snow => 0.6,
            Self::Heatwave => 0.7,
            Self::Storm => 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub kind: WeatherKind,
    pub temperature: f32,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            kind: WeatherKind::Clear,
            temperature: Season::Spring.base_temperature(),
        }
    }
}

impl Weather {
    /// Next weather given the season, volatility in [0, 1], and two rolls in [0, 1).
    pub fn next(season: Season, volatility: f32, temp_roll: f32, kind_roll: f32) -> Self {
        let volatility = unit(volatility);
        let spread = 4.0 + 12.0 * volatility;
        let temperature = season.base_temperature() + (unit(temp_roll) - 0.5) * 2.0 * spread;

        let extreme = 0.1 + 0.3 * volatility;
        let roll = unit(kind_roll);
        let kind = if roll < extreme {
            if season == Season::Winter && temperature < 2.0 {
                WeatherKind::Snow
            } else if season == Season::Summer && temperature > 28.0 {
                WeatherKind::Heatwave
            } else {
                WeatherKind::Storm
            }
        } else if roll < extreme + 0.25 {
            if temperature < 0.0 {
                WeatherKind::Snow
            } else {
                WeatherKind::Rain
            }
        } else if roll < extreme + 0.5 {
            WeatherKind::Cloudy
        } else {
            WeatherKind::Clear
        };
        Self { kind, temperature }
    }

    pub fn describe(&self) -> String {
        format!("{:?}, {:.0}°C", self.kind, self.temperature)
    }
}

/// Overall health of the natural world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ecosystem {
    /// 0.0 collapsed .. 1.0 thriving.
    pub balance: f32,
    pub fertility: f32,
    pub wildlife: f32,
}

impl Default for Ecosystem {
    fn default() -> Self {
        Self {
            balance: 0.7,
            fertility: 0.6,
            wildlife: 0.6,
        }
    }
}

impl Ecosystem {
    /// One turn of drift: harsh weather erodes balance, calm weather lets it
    /// recover toward a ceiling set by `volatility`.
    pub fn drift(&mut self, weather: &Weather, season: Season, volatility: f32) {
        let severity = weather.kind.severity();
        let ceiling = 1.0 - 0.4 * unit(volatility);
        if severity >= 0.5 {
            self.balance = unit(self.balance - 0.02 * severity);
        } else if self.balance < ceiling {
            self.balance = unit((self.balance + 0.01).min(ceiling));
        }
        let fertility_target = if season.is_growing() { 0.8 } else { 0.3 };
        self.fertility = unit(self.fertility + (fertility_target * self.balance - self.fertility) * 0.1);
        self.wildlife = unit(self.wildlife + (self.balance - self.wildlife) * 0.05);
    }

    pub fn shift(&mut self, delta: f32) {
        self.balance = unit(self.balance + delta);
    }
}

/// Per-agent view of the environment fed to the decay engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ambient {
    pub temperature: f32,
    /// Weather severity, 0..1.
    pub harshness: f32,
    pub season: Season,
}

impl Default for Ambient {
    fn default() -> Self {
        Self {
            temperature: 18.0,
            harshness: 0.0,
            season: Season::Spring,
        }
    }
}

impl Ambient {
    /// Thermal satisfaction an agent drifts toward at this temperature.
    pub fn thermal_target(&self) -> f32 {
        let (low, high) = COMFORT_BAND;
        let outside = if self.temperature < low {
            low - self.temperature
        } else if self.temperature > high {
            self.temperature - high
        } else {
            0.0
        };
        unit(1.0 - outside / THERMAL_TOLERANCE)
    }
}

/// The full environment snapshot carried by a world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub calendar: Calendar,
    pub weather: Weather,
    pub ecosystem: Ecosystem,
    /// Weather volatility, 0 calm .. 1 chaotic.
    pub volatility: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            calendar: Calendar::default(),
            weather: Weather::default(),
            ecosystem: Ecosystem::default(),
            volatility: 0.3,
        }
    }
}

impl Environment {
    pub fn ambient(&self) -> Ambient {
        Ambient {
            temperature: self.weather.temperature,
            harshness: self.weather.kind.severity(),
            season: self.calendar.season(),
        }
    }

    /// Advance calendar, weather, and ecosystem by one turn.
    pub fn advance(&mut self, temp_roll: f32, kind_roll: f32) {
        self.calendar.advance();
        let season = self.calendar.season();
        self.weather = Weather::next(season, self.volatility, temp_roll, kind_roll);
        self.ecosystem.drift(&self.weather, season, self.volatility);
    }

    pub fn summary(&self) -> String {
        format!(
            "Year {}, day {} ({:?}); {}; balance {:.2}",
            self.calendar.year,
            self.calendar.day,
            self.calendar.season(),
            self.weather.describe(),
            self.ecosystem.balance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_rolls_over_year() {
        let mut calendar = Calendar {
            day: 355,
            year: 3,
            days_per_turn: 10,
        };
        calendar.advance();
        assert_eq!((calendar.day, calendar.year), (5, 4));
        assert_eq!(calendar.season(), Season::Spring);
    }

    #[test]
    fn test_seasons_by_day() {
        let at = |day| Calendar { day, ..Calendar::default() }.season();
        assert_eq!(at(0), Season::Spring);
        assert_eq!(at(90), Season::Summer);
        assert_eq!(at(200), Season::Autumn);
        assert_eq!(at(359), Season::Winter);
    }

    #[test]
    fn test_weather_is_a_pure_function_of_rolls() {
        let a = Weather::next(Season::Autumn, 0.5, 0.3, 0.7);
        let b = Weather::next(Season::Autumn, 0.5, 0.3, 0.7);
        assert_eq!(a, b);
        assert_eq!(a.kind, WeatherKind::Cloudy);
    }

    #[test]
    fn test_low_kind_roll_in_cold_winter_snows() {
        let w = Weather::next(Season::Winter, 0.0, 0.0, 0.0);
        assert_eq!(w.kind, WeatherKind::Snow);
        assert!(w.temperature < 0.0);
    }

    #[test]
    fn test_storms_erode_balance() {
        let mut eco = Ecosystem::default();
        let storm = Weather {
            kind: WeatherKind::Storm,
            temperature: 10.0,
        };
        eco.drift(&storm, Season::Autumn, 0.5);
        assert!(eco.balance < 0.7);
    }

    #[test]
    fn test_thermal_target() {
        let mild = Ambient::default();
        assert_eq!(mild.thermal_target(), 1.0);
        let frigid = Ambient {
            temperature: -18.0,
            ..Ambient::default()
        };
        assert_eq!(frigid.thermal_target(), 0.0);
    }
}
