use std::fmt::Write as _;

use console_core::{
    floor_buttons::LatchState, ConsoleSnapshot, Notification, NotificationSeverity,
};

pub fn render_snapshot(snapshot: &ConsoleSnapshot) -> String {
    let mut out = String::new();

    if !snapshot.configured {
        match &snapshot.configuration_error {
            Some(reason) => {
                let _ = writeln!(out, "console unavailable: {reason}");
            }
            None => {
                let _ = writeln!(out, "waiting for configuration...");
            }
        }
        return out;
    }

    let _ = writeln!(out, "== Car Status ==");
    for car in &snapshot.cars {
        let _ = writeln!(
            out,
            "  {:<12} status: {:<10} floor: {}",
            car.car_name, car.status, car.current_floor
        );
    }

    for floor in snapshot.floors.iter().rev() {
        let _ = writeln!(
            out,
            "== Floor {} ==  up: {}  down: {}",
            floor.floor,
            latch_label(floor.up),
            latch_label(floor.down)
        );
        for door in &floor.doors {
            match &door.cue {
                Some(cue) => {
                    let _ = writeln!(
                        out,
                        "  {:<12} awaiting destination (going {}, request {})",
                        door.car_name,
                        cue.direction(),
                        cue.id()
                    );
                }
                None => {
                    let _ = writeln!(out, "  {:<12} Doors Closed", door.car_name);
                }
            }
        }
    }
    out
}

pub fn render_notification(notification: &Notification) -> String {
    let marker = match notification.severity {
        NotificationSeverity::Blocking => "!!",
        NotificationSeverity::Error => "! ",
    };
    format!(
        "{marker} [{}] {}",
        notification.raised_at.format("%H:%M:%S"),
        notification.message
    )
}

fn latch_label(latch: LatchState) -> &'static str {
    match latch {
        LatchState::Armed => "[ ]",
        LatchState::Pressed => "[*]",
        LatchState::Disabled => " - ",
    }
}
