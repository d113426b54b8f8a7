//! Serial console: line parser and command executor.
//!
//! ```text
//!   stdin line ──▶ parse_line() ──▶ AppCommand ──▶ Console::execute() ──▶ reply text
//! ```
//!
//! Configuration edits go through [`SharedConfig::apply`], so a rejected
//! value never reaches the running controllers.

use core::fmt::{self, Write};

use embassy_time::Duration;

use super::commands::{AppCommand, Arg, LightCommand};
use super::ports::{ClockPort, ConfigError, ConfigPort, FanPort};
use super::shared::{SharedConfig, StatusCell};
use crate::config::DimmerMode;
use crate::fixed::Fixed;
use crate::params::{self, PARAMS, ParamError};
use crate::schedule::{LightMode, TimeOfDay};

/// Longest wait for the configuration lock from the console.
const CONSOLE_WAIT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    Unknown,
    /// Bad arguments; carries the usage line.
    Usage(&'static str),
    Param(ParamError),
    Config(ConfigError),
    Output,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown command, try 'help'"),
            Self::Usage(u) => write!(f, "usage: {}", u),
            Self::Param(e) => write!(f, "{}", e),
            Self::Config(e) => write!(f, "{}", e),
            Self::Output => write!(f, "output error"),
        }
    }
}

impl From<ParamError> for CommandError {
    fn from(e: ParamError) -> Self {
        Self::Param(e)
    }
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<fmt::Error> for CommandError {
    fn from(_: fmt::Error) -> Self {
        Self::Output
    }
}

const USAGE_DATE: &str = "date [hh:mm[:ss]]";
const USAGE_LIGHT: &str = "light [on|off|auto|<start> <end>]";
const USAGE_GET: &str = "get [name]";
const USAGE_SET: &str = "set <name> <value>";
const USAGE_DIM: &str = "dim <0-100>";

const HELP: &[(&str, &str)] = &[
    ("temp", "last sensor reading"),
    (USAGE_DATE, "show or set the clock"),
    (USAGE_LIGHT, "show or override the grow light"),
    (USAGE_GET, "show parameters"),
    (USAGE_SET, "change a parameter"),
    (USAGE_DIM, "manual fan level"),
    ("zc", "measure mains zero-cross"),
    ("save", "store configuration"),
    ("help", "this list"),
];

fn arg(s: &str) -> Result<Arg, CommandError> {
    Arg::try_from(s).map_err(|_| CommandError::Param(ParamError::Invalid))
}

/// Parse one console line.  Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<AppCommand>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let a1 = words.next();
    let a2 = words.next();
    let extra = words.next().is_some();

    let cmd = match (verb, a1, a2) {
        ("temp", None, None) => AppCommand::Temp,
        ("date", None, None) => AppCommand::Date(None),
        ("date", Some(t), None) => AppCommand::Date(Some(
            t.parse().map_err(|_| CommandError::Usage(USAGE_DATE))?,
        )),
        ("date", ..) => return Err(CommandError::Usage(USAGE_DATE)),
        ("light", None, None) => AppCommand::Light(LightCommand::Show),
        ("light", Some("on" | "1"), None) => AppCommand::Light(LightCommand::On),
        ("light", Some("off" | "0"), None) => AppCommand::Light(LightCommand::Off),
        ("light", Some("auto" | "daytime"), None) => AppCommand::Light(LightCommand::Auto),
        ("light", Some(s), Some(e)) if !extra => {
            let parse = |v: &str| v.parse::<TimeOfDay>().map_err(|_| CommandError::Usage(USAGE_LIGHT));
            AppCommand::Light(LightCommand::Window { start: parse(s)?, end: parse(e)? })
        }
        ("light", ..) => return Err(CommandError::Usage(USAGE_LIGHT)),
        ("get", name, None) => AppCommand::Get(name.map(arg).transpose()?),
        ("get", ..) => return Err(CommandError::Usage(USAGE_GET)),
        ("set", Some(n), Some(v)) if !extra => AppCommand::Set { name: arg(n)?, value: arg(v)? },
        ("set", ..) => return Err(CommandError::Usage(USAGE_SET)),
        ("dim", Some(l), None) => AppCommand::Dim(l.parse().map_err(|_| CommandError::Usage(USAGE_DIM))?),
        ("dim", ..) => return Err(CommandError::Usage(USAGE_DIM)),
        ("zc", None, None) => AppCommand::ZeroCross,
        ("save", None, None) => AppCommand::Save,
        ("help" | "?", _, _) => AppCommand::Help,
        _ => return Err(CommandError::Unknown),
    };
    if extra {
        return Err(CommandError::Unknown);
    }
    Ok(Some(cmd))
}

/// Executes console commands against the shared state and the ports.
pub struct Console<'a, F, C, P> {
    config: &'a SharedConfig,
    status: &'a StatusCell,
    fan: F,
    clock: C,
    store: P,
}

impl<'a, F: FanPort, C: ClockPort, P: ConfigPort> Console<'a, F, C, P> {
    pub fn new(config: &'a SharedConfig, status: &'a StatusCell, fan: F, clock: C, store: P) -> Self {
        Self { config, status, fan, clock, store }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn fan(&self) -> &F {
        &self.fan
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Parse and run one line; errors are written to `out` as text.
    pub async fn handle_line(&mut self, line: &str, out: &mut impl Write) -> fmt::Result {
        let result = match parse_line(line) {
            Ok(Some(cmd)) => self.execute(&cmd, out).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => writeln!(out, "error: {}", e),
        }
    }

    pub async fn execute(&mut self, cmd: &AppCommand, out: &mut impl Write) -> Result<(), CommandError> {
        match cmd {
            AppCommand::Temp => self.show_reading(out)?,
            AppCommand::Date(None) => self.show_time(out)?,
            AppCommand::Date(Some(t)) => {
                if !self.clock.set_time_of_day(*t) {
                    return Err(CommandError::Usage(USAGE_DATE));
                }
                self.show_time(out)?;
            }
            AppCommand::Light(LightCommand::Show) => self.show_light(out)?,
            AppCommand::Light(lc) => {
                let lc = *lc;
                self.config
                    .apply(CONSOLE_WAIT, |c| {
                        match lc {
                            LightCommand::Off => c.light.mode = LightMode::Off,
                            LightCommand::On => c.light.mode = LightMode::On,
                            LightCommand::Auto => c.light.mode = LightMode::Daytime,
                            LightCommand::Window { start, end } => {
                                c.light.mode = LightMode::Daytime;
                                c.light.start = start;
                                c.light.end = end;
                            }
                            LightCommand::Show => {}
                        }
                        Ok::<(), CommandError>(())
                    })
                    .await?;
                self.show_light(out)?;
            }
            AppCommand::Get(None) => {
                let cfg = self.snapshot().await?;
                for p in PARAMS.iter() {
                    write!(out, "{:<16}= ", p.name)?;
                    p.write_value(&cfg, out)?;
                    writeln!(out)?;
                }
            }
            AppCommand::Get(Some(name)) => {
                let p = params::find(name).ok_or(ParamError::Unknown)?;
                let cfg = self.snapshot().await?;
                p.write_value(&cfg, out)?;
                writeln!(out)?;
            }
            AppCommand::Set { name, value } => {
                let p = params::find(name).ok_or(ParamError::Unknown)?;
                self.config
                    .apply(CONSOLE_WAIT, |c| p.set(c, value).map_err(CommandError::from))
                    .await?;
                let cfg = self.snapshot().await?;
                write!(out, "{} = ", p.name)?;
                p.write_value(&cfg, out)?;
                writeln!(out)?;
            }
            AppCommand::Dim(level) => {
                let level = *level;
                let manual = u8::try_from(level).map_err(|_| CommandError::Usage(USAGE_DIM))?;
                self.config
                    .apply(CONSOLE_WAIT, |c| {
                        c.dimmer_mode = DimmerMode::Manual;
                        c.manual_level = manual;
                        Ok::<(), CommandError>(())
                    })
                    .await?;
                self.fan.set_fan_level(level);
                writeln!(out, "fan level {} (manual)", self.fan.fan_level())?;
            }
            AppCommand::ZeroCross => match self.fan.zero_cross().await {
                Ok(s) => {
                    let period = u64::from(s.period);
                    let hz = if period == 0 { 0 } else { 100_000_000 / period };
                    writeln!(
                        out,
                        "zero-cross: period {} us, offset {} us, {}.{:02} Hz",
                        s.period,
                        s.sub,
                        hz / 100,
                        hz % 100
                    )?;
                }
                Err(e) => writeln!(out, "zero-cross: {}", e)?,
            },
            AppCommand::Save => {
                let cfg = self.snapshot().await?;
                self.store.save(&cfg)?;
                writeln!(out, "saved")?;
            }
            AppCommand::Help => {
                for (usage, what) in HELP {
                    writeln!(out, "{:<36}{}", usage, what)?;
                }
                writeln!(out, "parameters:")?;
                for p in PARAMS.iter() {
                    writeln!(out, "  {:<16}{}", p.name, p.help)?;
                }
            }
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<crate::config::SystemConfig, CommandError> {
        self.config
            .snapshot(CONSOLE_WAIT)
            .await
            .ok_or(CommandError::Config(ConfigError::Busy))
    }

    fn show_reading(&self, out: &mut impl Write) -> Result<(), CommandError> {
        let s = self.status.get();
        match s.last {
            Some(r) => {
                let age = self.clock.uptime_ms().wrapping_sub(s.timestamp_ms) / 1000;
                writeln!(
                    out,
                    "T={:.1}C RH={:.1}% ({} s ago, {} read errors)",
                    Fixed::from_tenths(i32::from(r.temperature)),
                    Fixed::from_tenths(i32::from(r.humidity)),
                    age,
                    s.read_errors
                )?;
            }
            None => writeln!(out, "no reading yet ({} read errors)", s.read_errors)?,
        }
        Ok(())
    }

    fn show_time(&self, out: &mut impl Write) -> Result<(), CommandError> {
        match self.clock.time_of_day() {
            Some(t) => writeln!(out, "{}", t)?,
            None => writeln!(out, "clock not set")?,
        }
        Ok(())
    }

    fn show_light(&self, out: &mut impl Write) -> Result<(), CommandError> {
        let cfg = self.config.try_snapshot().ok_or(ConfigError::Busy)?;
        let now = self.clock.time_of_day();
        let state = match cfg.light.is_on(now) {
            Some(true) => "on",
            Some(false) => "off",
            None => "unknown (clock not set)",
        };
        writeln!(
            out,
            "light: {} {}-{} -> {}",
            params::light_mode_name(cfg.light.mode),
            cfg.light.start,
            cfg.light.end,
            state
        )?;
        Ok(())
    }
}
