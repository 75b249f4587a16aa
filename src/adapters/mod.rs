//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements                | Connects to              |
//! |------------|---------------------------|--------------------------|
//! | `log_bus`  | MessageBus, Connectivity  | Serial log output        |
//! | `mqtt`     | MessageBus, Connectivity  | MQTT broker (ESP-IDF)    |
//! | `time`     | Clock                     | ESP32 system timer       |
//! | `wifi`     | Connectivity              | ESP-IDF WiFi STA         |

pub mod log_bus;
pub mod mqtt;
pub mod time;
pub mod wifi;
