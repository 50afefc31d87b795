//! Built-in mobile device emulation profiles.

/// Viewport, pixel ratio and user agent of an emulated device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
    pub user_agent: &'static str,
}

const DEVICES: &[DeviceProfile] = &[
    DeviceProfile {
        name: "iPhone 12",
        width: 390,
        height: 664,
        device_scale_factor: 3.0,
        is_mobile: true,
        has_touch: true,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 14_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Mobile/15E148 Safari/604.1",
    },
    DeviceProfile {
        name: "iPhone 13",
        width: 390,
        height: 664,
        device_scale_factor: 3.0,
        is_mobile: true,
        has_touch: true,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1",
    },
    DeviceProfile {
        name: "Pixel 5",
        width: 393,
        height: 727,
        device_scale_factor: 2.75,
        is_mobile: true,
        has_touch: true,
        user_agent: "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.91 Mobile Safari/537.36",
    },
    DeviceProfile {
        name: "Galaxy S9+",
        width: 320,
        height: 658,
        device_scale_factor: 4.5,
        is_mobile: true,
        has_touch: true,
        user_agent: "Mozilla/5.0 (Linux; Android 8.0.0; SM-G965U Build/R16NW) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/63.0.3239.111 Mobile Safari/537.36",
    },
    DeviceProfile {
        name: "iPad Mini",
        width: 768,
        height: 1024,
        device_scale_factor: 2.0,
        is_mobile: true,
        has_touch: true,
        user_agent: "Mozilla/5.0 (iPad; CPU OS 11_0 like Mac OS X) AppleWebKit/604.1.34 (KHTML, like Gecko) Version/11.0 Mobile/15A5341f Safari/604.1",
    },
];

/// All built-in profiles.
pub fn all() -> &'static [DeviceProfile] {
    DEVICES
}

/// Looks up a profile by name, ignoring ASCII case.
pub fn find(name: &str) -> Option<&'static DeviceProfile> {
    DEVICES.iter().find(|d| d.name.eq_ignore_ascii_case(name.trim()))
}

pub fn names() -> Vec<&'static str> {
    DEVICES.iter().map(|d| d.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_default_device_case_insensitively() {
        let d = find("iphone 12").expect("iPhone 12 profile");
        assert_eq!(d.name, "iPhone 12");
        assert_eq!((d.width, d.height), (390, 664));
        assert!(d.is_mobile && d.has_touch);
    }

    #[test]
    fn unknown_device() {
        assert!(find("Nokia 3310").is_none());
    }

    #[test]
    fn names_are_unique() {
        let mut names = names();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all().len());
    }
}
