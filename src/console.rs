//! Operator commands typed on stdin while the monitor runs.

use crate::core::geo::Coord;

pub const HELP: &str = "commands: radius <km> | alerts on|off|toggle | focus on|off|toggle | \
pos <lat> <lng> | refresh | targets | status | log | help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
    Toggle,
}

impl Switch {
    pub fn apply(self, current: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Toggle => !current,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopCommand {
    SetRadius(f64),
    Alerts(Switch),
    AutoFocus(Switch),
    Position(Coord),
    Refresh,
    Targets,
    Status,
    ShowLog,
    Help,
}

pub fn parse_command(line: &str) -> Result<LoopCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(HELP.to_string());
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("radius", [km]) => LoopCommand::SetRadius(parse_number(km)?),
        ("alerts", [state]) => LoopCommand::Alerts(parse_switch(state)?),
        ("focus", [state]) => LoopCommand::AutoFocus(parse_switch(state)?),
        ("pos", [lat, lng]) => {
            let lat = parse_number(lat)?;
            let lng = parse_number(lng)?;
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(format!("position out of range: {lat}, {lng}"));
            }
            LoopCommand::Position(Coord::new(lat, lng))
        }
        ("refresh", []) => LoopCommand::Refresh,
        ("targets", []) => LoopCommand::Targets,
        ("status", []) => LoopCommand::Status,
        ("log", []) => LoopCommand::ShowLog,
        ("help", _) => LoopCommand::Help,
        _ => return Err(format!("unrecognized command {:?}; {HELP}", line.trim())),
    };
    Ok(command)
}

fn parse_number(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("not a number: {raw}"))
}

fn parse_switch(raw: &str) -> Result<Switch, String> {
    match raw.to_ascii_lowercase().as_str() {
        "on" => Ok(Switch::On),
        "off" => Ok(Switch::Off),
        "toggle" => Ok(Switch::Toggle),
        _ => Err(format!("expected on|off|toggle, got {raw}")),
    }
}
