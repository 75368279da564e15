// Keyboard teleop for the swerve runtime
//
// W/S forward-back, A/D strafe, Z/X rotate, R/F speed up/down,
// T toggles field-relative driving, Q or Esc quits.
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use swerve_zenoh_runtime::config::{LOOP_HZ, TOPIC_CMD_DRIVE};
use swerve_zenoh_runtime::messages::DriveCommand;
use tracing::info;

/// Fractions of the runtime's max linear/angular speed per gear
const GEARS: [(&str, f64, f64); 3] = [("LOW", 0.2, 0.15), ("MED", 0.5, 0.4), ("HIGH", 1.0, 0.8)];

/// Axes drop back to zero when no movement key arrives for this long
const RELEASE_AFTER: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
enum Axis {
    Forward,
    Strafe,
    Rotate,
}

/// Movement key -> (axis, direction)
fn binding(code: KeyCode) -> Option<(Axis, f64)> {
    match code {
        KeyCode::Char('w') => Some((Axis::Forward, 1.0)),
        KeyCode::Char('s') => Some((Axis::Forward, -1.0)),
        KeyCode::Char('a') => Some((Axis::Strafe, 1.0)),
        KeyCode::Char('d') => Some((Axis::Strafe, -1.0)),
        KeyCode::Char('z') => Some((Axis::Rotate, 1.0)),
        KeyCode::Char('x') => Some((Axis::Rotate, -1.0)),
        _ => None,
    }
}

struct Teleop {
    cmd: DriveCommand,
    gear: usize,
    last_movement: Instant,
}

impl Teleop {
    fn new() -> Self {
        Self {
            cmd: DriveCommand::stop(),
            gear: 0,
            last_movement: Instant::now(),
        }
    }

    /// Apply one key press; returns false when the operator quits
    fn on_key(&mut self, code: KeyCode) -> bool {
        if let Some((axis, direction)) = binding(code) {
            let (_, linear, angular) = GEARS[self.gear];
            match axis {
                Axis::Forward => self.cmd.x_speed = direction * linear,
                Axis::Strafe => self.cmd.y_speed = direction * linear,
                Axis::Rotate => self.cmd.z_rotation = direction * angular,
            }
            self.last_movement = Instant::now();
            return true;
        }

        match code {
            KeyCode::Char('r') => self.shift((self.gear + 1).min(GEARS.len() - 1)),
            KeyCode::Char('f') => self.shift(self.gear.saturating_sub(1)),
            KeyCode::Char('t') => {
                self.cmd.field_relative = !self.cmd.field_relative;
                info!("Field relative: {}", self.cmd.field_relative);
            }
            KeyCode::Char('q') | KeyCode::Esc => return false,
            _ => {}
        }
        true
    }

    fn shift(&mut self, gear: usize) {
        self.gear = gear;
        info!("Gear: {}", GEARS[gear].0);
    }

    /// Command to publish this tick, with released axes zeroed
    fn command(&mut self) -> DriveCommand {
        if self.last_movement.elapsed() > RELEASE_AFTER {
            self.cmd = DriveCommand {
                field_relative: self.cmd.field_relative,
                ..DriveCommand::stop()
            };
        }
        self.cmd
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: WASD=move, Z/X=rotate, R/F=gear, T=field relative, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut teleop = Teleop::new();
    let poll = Duration::from_millis(1000 / LOOP_HZ);

    loop {
        if event::poll(poll)? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                // Toggles only fire on the initial press, movement also on auto-repeat
                let accepted = kind == KeyEventKind::Press
                    || (kind == KeyEventKind::Repeat && binding(code).is_some());
                if accepted && !teleop.on_key(code) {
                    break;
                }
            }
        }

        publisher.put(serde_json::to_string(&teleop.command())?).await?;
    }

    Ok(())
}
