//! Scrapers for `v4l2-ctl` text output.

use std::collections::HashMap;

use serde::Serialize;

const CONTROL_ORDER: &[&str] = &[
    "focus_auto",
    "focus_automatic_continuous",
    "focus_absolute",
    "exposure_auto",
    "exposure_absolute",
    "exposure_time_absolute",
    "white_balance_temperature_auto",
    "white_balance_temperature",
    "brightness",
    "contrast",
    "saturation",
    "sharpness",
    "gain",
];

const SECTION_HEADERS: &[&str] = &[
    "User Controls",
    "Camera Controls",
    "Video Controls",
    "Image Controls",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub step: Option<i64>,
    pub default: Option<i64>,
    pub value: Option<i64>,
    pub menu: Vec<MenuItem>,
}

impl Control {
    /// Whether `value` fits the advertised range. Controls without a full
    /// range accept anything.
    pub fn accepts(&self, value: i64) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => (min..=max).contains(&value),
            _ => true,
        }
    }
}

/// Parses `--list-ctrls` output, e.g.
/// `brightness 0x00980900 (int)    : min=-64 max=64 step=1 default=0 value=0`.
pub fn parse_ctrls(output: &str) -> Vec<Control> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Error") && line.contains("0x"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let name = parts.first()?;
            let kind = match (line.find('('), line.find(')')) {
                (Some(open), Some(close)) if open < close => Some(line[open + 1..close].trim()),
                _ => None,
            };

            Some(Control {
                name: (*name).to_string(),
                kind: normalize_type(kind),
                min: int_field(&parts, "min"),
                max: int_field(&parts, "max"),
                step: int_field(&parts, "step"),
                default: int_field(&parts, "default"),
                value: int_field(&parts, "value"),
                menu: Vec::new(),
            })
        })
        .collect()
}

/// Parses `--list-ctrls-menus` output into menu items per control name.
pub fn parse_ctrl_menus(output: &str) -> HashMap<String, Vec<MenuItem>> {
    let mut menus: HashMap<String, Vec<MenuItem>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || SECTION_HEADERS.contains(&line) {
            continue;
        }

        if line.starts_with(|c: char| c.is_ascii_digit()) {
            let Some(name) = current.as_ref() else {
                continue;
            };
            let Some((value, label)) = line.split_once(':') else {
                continue;
            };
            let Ok(value) = value.trim().parse::<i64>() else {
                continue;
            };
            if let Some(items) = menus.get_mut(name) {
                items.push(MenuItem {
                    value,
                    label: label.trim().to_string(),
                });
            }
        } else if line.contains("0x") {
            let name = line.split_whitespace().next().unwrap_or_default().to_string();
            menus.entry(name.clone()).or_default();
            current = Some(name);
        }
    }

    menus
}

/// Stable sort putting the commonly tuned controls first.
pub fn sort_controls(controls: &mut [Control]) {
    controls.sort_by_key(|control| {
        CONTROL_ORDER
            .iter()
            .position(|name| *name == control.name)
            .unwrap_or(CONTROL_ORDER.len())
    });
}

/// Device paths from `--list-devices` output.
pub fn parse_listed_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("/dev/"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn normalize_type(kind: Option<&str>) -> String {
    match kind {
        None | Some("") => "unknown".to_string(),
        Some(kind) if kind.starts_with("int") => "int".to_string(),
        Some(kind) => kind.to_string(),
    }
}

fn int_field(parts: &[&str], field: &str) -> Option<i64> {
    parts.iter().find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key == field { value.parse().ok() } else { None }
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_ctrl_menus, parse_ctrls, parse_listed_devices, sort_controls};

    const LIST_CTRLS: &str = "
User Controls

                     brightness 0x00980900 (int)    : min=-64 max=64 step=1 default=0 value=12
                       contrast 0x00980901 (int)    : min=0 max=95 step=1 default=0 value=0
 white_balance_temperature_auto 0x0098090c (bool)   : default=1 value=1
           power_line_frequency 0x00980918 (menu)   : min=0 max=2 default=1 value=1 (50 Hz)
                      pan_speed 0x009a0920 (int64)  : min=-1 max=1 step=1 default=0 value=0 flags=inactive

Camera Controls

                  exposure_auto 0x009a0901 (menu)   : min=0 max=3 default=3 value=3 (Aperture Priority Mode)
                    focus_reset 0x009a0920          : value=0
Error: bad line 0x0
";

    const LIST_MENUS: &str = "
User Controls

           power_line_frequency 0x00980918 (menu)   : min=0 max=2 default=1 value=1 (50 Hz)
				0: Disabled
				1: 50 Hz
				2: 60 Hz
                     brightness 0x00980900 (int)    : min=-64 max=64 step=1 default=0 value=12

Camera Controls

                  exposure_auto 0x009a0901 (menu)   : min=0 max=3 default=3 value=3 (Aperture Priority Mode)
				1: Manual Mode
				3: Aperture Priority Mode
";

    #[test]
    fn parses_control_lines() {
        let controls = parse_ctrls(LIST_CTRLS);
        let names: Vec<&str> = controls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "brightness",
                "contrast",
                "white_balance_temperature_auto",
                "power_line_frequency",
                "pan_speed",
                "exposure_auto",
                "focus_reset",
            ]
        );

        let brightness = &controls[0];
        assert_eq!(brightness.kind, "int");
        assert_eq!(brightness.min, Some(-64));
        assert_eq!(brightness.max, Some(64));
        assert_eq!(brightness.step, Some(1));
        assert_eq!(brightness.value, Some(12));
        assert!(brightness.accepts(64));
        assert!(!brightness.accepts(65));

        assert_eq!(controls[2].kind, "bool");
        assert_eq!(controls[2].min, None);
        assert_eq!(controls[4].kind, "int", "int64 normalizes to int");
        assert_eq!(controls[6].kind, "unknown");
        assert!(controls[6].accepts(1000), "no range means no limit");
    }

    #[test]
    fn parses_menus_per_control() {
        let menus = parse_ctrl_menus(LIST_MENUS);

        let power = &menus["power_line_frequency"];
        assert_eq!(power.len(), 3);
        assert_eq!(power[1].value, 1);
        assert_eq!(power[1].label, "50 Hz");
        assert!(menus["brightness"].is_empty());
        assert_eq!(
            menus["exposure_auto"]
                .iter()
                .map(|item| item.value)
                .collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn menu_items_before_any_control_are_ignored() {
        let menus = parse_ctrl_menus("0: Orphan\n1: Also orphan\n");
        assert!(menus.is_empty());
    }

    #[test]
    fn sorts_priority_controls_first_and_keeps_the_rest_in_order() {
        let mut controls = parse_ctrls(LIST_CTRLS);
        sort_controls(&mut controls);
        let names: Vec<&str> = controls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "exposure_auto",
                "white_balance_temperature_auto",
                "brightness",
                "contrast",
                "power_line_frequency",
                "pan_speed",
                "focus_reset",
            ]
        );
    }

    #[test]
    fn lists_device_paths() {
        let output = "\
rkisp_mainpath (platform:rkisp-vir0):
\t/dev/video11
\t/dev/video12
\t/dev/media1

HD Webcam (usb-xhci-hcd.0-1):
\t/dev/video0 extra
";
        assert_eq!(
            parse_listed_devices(output),
            vec!["/dev/video11", "/dev/video12", "/dev/media1", "/dev/video0"]
        );
    }
}
