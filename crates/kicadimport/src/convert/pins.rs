//! Symbol pin names and pins

use super::metadata::clean_circuit_identifier;
use crate::geometry::{Angle, Point};
use crate::kicad;
use crate::librepcb::SymbolPin;
use std::collections::HashSet;
use uuid::Uuid;

/// Name and numbers of each pin of a gate, in the order of `pins`
///
/// Pins with the same name at the same position are merged into the first
/// of them, the others get an empty name and must be skipped. Names are made
/// unique by appending `_1`, `_2` and so on.
pub fn convert_symbol_pin_names(pins: &[kicad::SymbolPin]) -> Vec<(String, Vec<String>)> {
    struct Merged {
        name: String,
        numbers: Vec<String>,
        position: Point,
        placeholder: bool,
    }

    let mut merged: Vec<Merged> = Vec::with_capacity(pins.len());
    for pin in pins {
        let numbers: Vec<String> = Some(pin.number.clone())
            .filter(|n| !n.is_empty())
            .into_iter()
            .collect();
        let existing = merged
            .iter_mut()
            .find(|m| !m.placeholder && m.name == pin.name && m.position == pin.position);
        match existing {
            Some(existing) => {
                existing.numbers.extend(numbers);
                merged.push(Merged {
                    name: String::new(),
                    numbers: Vec::new(),
                    position: Point::default(),
                    placeholder: true,
                });
            }
            None => merged.push(Merged {
                name: pin.name.clone(),
                numbers,
                position: pin.position,
                placeholder: false,
            }),
        }
    }

    let mut used: HashSet<String> = HashSet::new();
    let names: Vec<String> = merged
        .iter()
        .map(|pin| {
            if pin.name.is_empty() {
                return String::new();
            }
            let name = convert_symbol_pin_name(&pin.name, &pin.numbers);
            used.insert(name.clone());
            name
        })
        .collect();

    merged
        .into_iter()
        .zip(&names)
        .map(|(pin, base)| {
            let mut name = base.clone();
            if !name.is_empty() {
                if names.iter().filter(|n| *n == base).count() > 1 {
                    let mut suffix = 1;
                    loop {
                        name = format!("{}_{}", base, suffix);
                        suffix += 1;
                        if !used.contains(&name) {
                            break;
                        }
                    }
                }
                used.insert(name.clone());
            }
            (name, pin.numbers)
        })
        .collect()
}

/// Pin name, or the pin numbers for unnamed (`~`) pins
pub fn convert_symbol_pin_name(name: &str, numbers: &[String]) -> String {
    if name.is_empty() || name == "~" {
        convert_circuit_identifier(&numbers.join(","))
    } else {
        convert_circuit_identifier(name)
    }
}

/// Convert `~{...}` overbars to `!` inversion markers and clean the result
pub fn convert_circuit_identifier(text: &str) -> String {
    let mut chars: Vec<(char, bool)> = Vec::new();
    let mut inverted = false;
    let mut iter = text.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '~' && iter.peek() == Some(&'{') {
            iter.next();
            inverted = true;
        } else if ch == '}' && inverted {
            inverted = false;
        } else {
            chars.push((ch, inverted));
        }
    }

    let mut out = String::new();
    inverted = false;
    for (ch, invert) in chars {
        if !inverted && invert {
            if ch == '/' {
                out.push('!');
            }
            out.push('!');
            inverted = true;
        } else if inverted && !invert {
            if ch != '/' {
                out.push('!');
            }
            inverted = false;
        } else if inverted && ch == '/' {
            out.push('!');
        }
        out.push(ch);
    }

    let out = clean_circuit_identifier(&out);
    if out.is_empty() {
        "UNNAMED".to_string()
    } else {
        out
    }
}

/// Pin with its name placed right of the pin end
pub fn convert_symbol_pin(pin: &kicad::SymbolPin, name: &str, pin_names_offset: f64) -> SymbolPin {
    SymbolPin {
        uuid: Uuid::new_v4(),
        name: name.to_string(),
        position: super::geometry::symbol_point(pin.position),
        rotation: Angle::deg(pin.rotation),
        length: pin.length,
        name_position: Point::new(pin.length + pin_names_offset, 0.0),
        name_rotation: Angle::ZERO,
        name_height: SymbolPin::DEFAULT_NAME_HEIGHT,
        name_alignment: SymbolPin::default_name_alignment(),
    }
}
