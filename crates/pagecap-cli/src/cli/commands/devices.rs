//! `pagecap devices` – list the mobile emulation profiles.

use pagecap_core::driver::devices;

pub fn run_devices() {
    println!("{:<14} {:<10} {:<5} {}", "NAME", "VIEWPORT", "DPR", "TOUCH");
    for d in devices::all() {
        println!(
            "{:<14} {:<10} {:<5} {}",
            d.name,
            format!("{}x{}", d.width, d.height),
            d.device_scale_factor,
            if d.has_touch { "yes" } else { "no" }
        );
    }
}
