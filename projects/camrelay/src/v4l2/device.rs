use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{
    error::ControlError,
    parse::{Control, parse_ctrl_menus, parse_ctrls, sort_controls},
    persistence::ControlValues,
    runner::{CtlOutput, CtlRunner},
};

/// One device node driven through the control utility.
pub struct V4l2Device<'a, R: CtlRunner + ?Sized> {
    runner: &'a R,
    path: &'a str,
}

impl<'a, R: CtlRunner + ?Sized> V4l2Device<'a, R> {
    pub fn new(runner: &'a R, path: &'a str) -> Self {
        Self { runner, path }
    }

    pub fn path(&self) -> &str {
        self.path
    }

    /// Controls with their menus merged in, commonly tuned ones first.
    pub async fn list_controls(&self) -> Result<Vec<Control>, ControlError> {
        let listed = self
            .checked(&["--list-ctrls"], "Failed to list controls")
            .await?;
        let mut controls = parse_ctrls(&listed.stdout);

        let menus = self.run(&["--list-ctrls-menus"]).await?;
        if menus.success() {
            let mut menus = parse_ctrl_menus(&menus.stdout);
            for control in &mut controls {
                if let Some(items) = menus.remove(&control.name).filter(|items| !items.is_empty()) {
                    control.menu = items;
                    control.kind = "menu".to_string();
                }
            }
        } else {
            debug!(
                "menu listing failed on {}: {}",
                self.path,
                menus.failure_message("no output")
            );
        }

        sort_controls(&mut controls);
        Ok(controls)
    }

    /// Current values, restricted to `names` when given. Controls without a
    /// reported value are left out.
    pub async fn get_values(&self, names: Option<&[String]>) -> Result<ControlValues, ControlError> {
        let listed = self
            .checked(&["--list-ctrls"], "Failed to get control values")
            .await?;

        Ok(parse_ctrls(&listed.stdout)
            .into_iter()
            .filter(|control| names.is_none_or(|names| names.contains(&control.name)))
            .filter_map(|control| control.value.map(|value| (control.name, value)))
            .collect())
    }

    /// Validates every change against the device's controls, then applies
    /// them in a single invocation.
    pub async fn set_controls(&self, changes: &Map<String, Value>) -> Result<ControlValues, ControlError> {
        if changes.is_empty() {
            return Err(ControlError::invalid("No controls provided"));
        }

        let listed = self
            .checked(&["--list-ctrls"], "Failed to list controls")
            .await?;
        let controls = parse_ctrls(&listed.stdout);

        let mut applied = ControlValues::new();
        for (name, value) in changes {
            let control = controls
                .iter()
                .find(|control| &control.name == name)
                .ok_or_else(|| ControlError::invalid(format!("Unknown control: {name}")))?;
            let value = control_value(value)
                .ok_or_else(|| ControlError::invalid(format!("Value for {name} must be integer")))?;
            match (control.min, control.max) {
                (Some(min), Some(max)) if !control.accepts(value) => {
                    return Err(ControlError::invalid(format!(
                        "{name}={value} out of range [{min}, {max}]"
                    )));
                }
                _ => {}
            }
            applied.insert(name.clone(), value);
        }

        let assignments = applied
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        let arg = format!("--set-ctrl={assignments}");
        self.checked(&[arg.as_str()], "Failed to set controls").await?;

        info!("applied {} on {}", assignments, self.path);
        Ok(applied)
    }

    pub async fn info(&self) -> Result<String, ControlError> {
        let output = self.checked(&["-D"], "Failed to fetch device info").await?;
        Ok(output.stdout)
    }

    async fn run(&self, args: &[&str]) -> Result<CtlOutput, ControlError> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.extend(["-d", self.path]);
        full.extend_from_slice(args);
        Ok(self.runner.run(&full).await?)
    }

    async fn checked(&self, args: &[&str], fallback: &str) -> Result<CtlOutput, ControlError> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ControlError::CommandFailed(output.failure_message(fallback)))
        }
    }
}

/// Integers as given; booleans as 1 and 0.
fn control_value(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(flag) => Some(i64::from(*flag)),
        other => other.as_i64(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};

    use crate::v4l2::{
        error::ControlError,
        runner::{CtlOutput, CtlRunner},
    };

    use super::V4l2Device;

    pub(crate) const CTRLS: &str = "
User Controls

                     brightness 0x00980900 (int)    : min=-64 max=64 step=1 default=0 value=12
                       contrast 0x00980901 (int)    : min=0 max=95 step=1 default=0 value=30
           power_line_frequency 0x00980918 (menu)   : min=0 max=2 default=1 value=1 (50 Hz)
                    focus_reset 0x009a0920          : value=0
";

    pub(crate) const MENUS: &str = "
User Controls

                     brightness 0x00980900 (int)    : min=-64 max=64 step=1 default=0 value=12
           power_line_frequency 0x00980918 (menu)   : min=0 max=2 default=1 value=1 (50 Hz)
\t\t\t\t0: Disabled
\t\t\t\t1: 50 Hz
\t\t\t\t2: 60 Hz
";

    /// Answers like a device with the controls above and records every call.
    #[derive(Default)]
    pub(crate) struct FakeCtl {
        pub calls: Mutex<Vec<Vec<String>>>,
        pub fail_set: bool,
    }

    impl FakeCtl {
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl CtlRunner for FakeCtl {
        async fn run(&self, args: &[&str]) -> Result<CtlOutput> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(args.iter().map(|arg| arg.to_string()).collect());

            let command = args.get(2).copied().unwrap_or_default();
            Ok(match command {
                "--list-ctrls" => CtlOutput::ok(CTRLS),
                "--list-ctrls-menus" => CtlOutput::ok(MENUS),
                "-D" => CtlOutput::ok("Driver Info:\n\tDriver name : uvcvideo\n"),
                set if set.starts_with("--set-ctrl=") && self.fail_set => CtlOutput {
                    code: 255,
                    stdout: String::new(),
                    stderr: "VIDIOC_S_EXT_CTRLS: failed: Input/output error\n".to_string(),
                },
                set if set.starts_with("--set-ctrl=") => CtlOutput::default(),
                _ => CtlOutput {
                    code: 1,
                    ..CtlOutput::default()
                },
            })
        }
    }

    fn changes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn lists_controls_with_menus_sorted() {
        let ctl = FakeCtl::default();
        let device = V4l2Device::new(&ctl, "/dev/video0");

        let controls = device.list_controls().await.expect("should list");
        let names: Vec<&str> = controls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["brightness", "contrast", "power_line_frequency", "focus_reset"]
        );

        let power = &controls[2];
        assert_eq!(power.kind, "menu");
        assert_eq!(power.menu.len(), 3);
        assert!(controls[0].menu.is_empty());
        assert_eq!(controls[0].kind, "int");
        assert_eq!(ctl.calls()[0], vec!["-d", "/dev/video0", "--list-ctrls"]);
    }

    #[tokio::test]
    async fn gets_values_optionally_filtered() {
        let ctl = FakeCtl::default();
        let device = V4l2Device::new(&ctl, "/dev/video0");

        let all = device.get_values(None).await.expect("should get");
        assert_eq!(all.len(), 4);
        assert_eq!(all["contrast"], 30);

        let names = vec!["brightness".to_string(), "missing".to_string()];
        let some = device.get_values(Some(&names)).await.expect("should get");
        assert_eq!(some.len(), 1);
        assert_eq!(some["brightness"], 12);
    }

    #[tokio::test]
    async fn applies_valid_changes_in_one_invocation() {
        let ctl = FakeCtl::default();
        let device = V4l2Device::new(&ctl, "/dev/video0");

        let applied = device
            .set_controls(&changes(json!({"contrast": 40, "brightness": -5})))
            .await
            .expect("should set");
        assert_eq!(applied["brightness"], -5);
        assert_eq!(applied["contrast"], 40);

        let last = ctl.calls().pop().expect("a call");
        assert_eq!(
            last,
            vec!["-d", "/dev/video0", "--set-ctrl=brightness=-5,contrast=40"]
        );
    }

    #[tokio::test]
    async fn rejects_invalid_changes_before_touching_the_device() {
        let ctl = FakeCtl::default();
        let device = V4l2Device::new(&ctl, "/dev/video0");

        let cases = [
            (json!({}), "No controls provided"),
            (json!({"zoom": 1}), "Unknown control: zoom"),
            (json!({"brightness": "bright"}), "Value for brightness must be integer"),
            (json!({"brightness": 1.5}), "Value for brightness must be integer"),
            (json!({"contrast": 96}), "contrast=96 out of range [0, 95]"),
        ];
        for (input, expected) in cases {
            let err = device
                .set_controls(&changes(input))
                .await
                .expect_err("should be rejected");
            assert!(matches!(err, ControlError::Invalid(_)), "{err:?}");
            assert_eq!(err.to_string(), expected);
        }

        assert!(
            ctl.calls()
                .iter()
                .all(|call| !call[2].starts_with("--set-ctrl")),
            "nothing applied"
        );
    }

    #[tokio::test]
    async fn controls_without_range_take_any_integer() {
        let ctl = FakeCtl::default();
        let device = V4l2Device::new(&ctl, "/dev/video0");

        let applied = device
            .set_controls(&changes(json!({"focus_reset": 9000})))
            .await
            .expect("should set");
        assert_eq!(applied["focus_reset"], 9000);
    }

    #[tokio::test]
    async fn booleans_are_applied_as_one_and_zero() {
        let ctl = FakeCtl::default();
        let device = V4l2Device::new(&ctl, "/dev/video0");

        let applied = device
            .set_controls(&changes(json!({"contrast": true, "focus_reset": false})))
            .await
            .expect("should set");
        assert_eq!(applied["contrast"], 1);
        assert_eq!(applied["focus_reset"], 0);

        let last = ctl.calls().pop().expect("a call");
        assert_eq!(last[2], "--set-ctrl=contrast=1,focus_reset=0");
    }

    #[tokio::test]
    async fn utility_failure_carries_its_stderr() {
        let ctl = FakeCtl {
            fail_set: true,
            ..FakeCtl::default()
        };
        let device = V4l2Device::new(&ctl, "/dev/video0");

        let err = device
            .set_controls(&changes(json!({"brightness": 1})))
            .await
            .expect_err("set should fail");
        assert!(matches!(err, ControlError::CommandFailed(_)));
        assert!(err.to_string().contains("Input/output error"));
    }

    #[tokio::test]
    async fn info_returns_utility_stdout() {
        let ctl = FakeCtl::default();
        let info = V4l2Device::new(&ctl, "/dev/video0")
            .info()
            .await
            .expect("should read info");
        assert!(info.contains("uvcvideo"));
    }
}
