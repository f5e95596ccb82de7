//! `Device/config.h`: per-device configuration macros

use serde_json::Value;

use super::{device_macro_stem, GeneratorInputs};
use crate::config::{DeviceConfig, CONFIG_FILE};

/// Devices that sit on the software I2C bus when no protocol is configured
const KNOWN_I2C_DEVICES: &[&str] = &["bmp280", "hmc588", "mpu6050", "sh1106", "ssd1306"];

fn uses_protocol(name: &str, device: &DeviceConfig, protocol: &str) -> bool {
    match device.protocol.as_deref() {
        Some(configured) => configured.eq_ignore_ascii_case(protocol),
        None => protocol == "i2c" && KNOWN_I2C_DEVICES.contains(&name.to_ascii_lowercase().as_str()),
    }
}

/// Macro body for a `config` entry, `None` for values with no macro form
fn macro_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(if *flag { "1" } else { "0" }.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn define(name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("#define {}", name)
    } else {
        format!("#define {} {}", name, value)
    }
}

/// Render the device configuration header
pub fn device_config_header(inputs: &GeneratorInputs<'_>) -> String {
    let devices: Vec<_> = inputs.config.enabled_devices().collect();
    let mut out = Vec::new();

    out.push("/**".to_string());
    out.push(" * @file    config.h".to_string());
    out.push(" * @brief   Device driver configuration (generated)".to_string());
    out.push(format!(" * @details Configure devices in {} and re-run the scaffolder.", CONFIG_FILE));
    out.push(" * @warning Regenerated on every run; manual edits are lost.".to_string());
    out.push(" */".to_string());
    out.push(String::new());
    out.push("#ifndef __CONFIG_H_".to_string());
    out.push("#define __CONFIG_H_".to_string());
    out.push(String::new());
    out.push("#include <stdint.h>".to_string());
    out.push(String::new());

    if devices.iter().any(|(name, device)| uses_protocol(name, device, "i2c")) {
        out.push("/* I2C bus */".to_string());
        out.push("#define __SOFTI2C_".to_string());
        out.push(String::new());
        out.push("#ifdef __SOFTI2C_".to_string());
        out.push("#include <i2c/df_iic.h>".to_string());
        out.push("extern df_iic_t i2c1_bus;".to_string());
        out.push("#define i2c_Dev (*i2c1_bus.soft_iic)".to_string());
        out.push("#endif".to_string());
        out.push(String::new());
    }

    if devices.iter().any(|(name, device)| uses_protocol(name, device, "spi")) {
        out.push("/* SPI bus */".to_string());
        out.push("#define __SOFTSPI_".to_string());
        out.push(String::new());
        out.push("#ifdef __SOFTSPI_".to_string());
        out.push("#include <spi/df_spi.h>".to_string());
        out.push("extern df_spi_t spi1_bus;".to_string());
        out.push("#define spi_Dev (*spi1_bus.soft_spi)".to_string());
        out.push("#endif".to_string());
        out.push(String::new());
    }

    for (name, device) in &devices {
        let stem = device_macro_stem(name);
        match device.description.as_deref() {
            Some(description) => out.push(format!("/* {}: {} */", name, description)),
            None => out.push(format!("/* {} */", name)),
        }
        out.push(format!("#ifdef USE_DEVICE_{}", stem));
        if let Some(addr) = device.default_addr.as_deref().filter(|addr| !addr.is_empty()) {
            out.push(define(&format!("{}_DEFAULT_ADDR", stem), addr));
        }
        for (key, value) in &device.config {
            if let Some(body) = macro_value(value) {
                out.push(define(&format!("{}_{}", stem, device_macro_stem(key)), &body));
            }
        }
        out.push(format!("#endif /* USE_DEVICE_{} */", stem));
        out.push(String::new());
    }

    out.push("#endif /* __CONFIG_H_ */".to_string());

    let mut text = out.join("\n");
    text.push('\n');
    text
}
