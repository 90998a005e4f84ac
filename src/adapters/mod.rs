//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                     |
//! |------------|--------------------|---------------------------------|
//! | `delay`    | DelayPort          | async-io-mini reactor timers    |
//! | `hardware` | ActuatorPort       | GPIO outputs, LEDC servo PWM    |
//! | `http`     | HttpTransport      | EspHttpConnection / TcpStream   |
//! | `log_sink` | EventSink          | Serial log output               |
//! | `nvs`      | ConfigPort         | NVS / in-memory store           |
//! | `time`     | —                  | ESP32 high-resolution timer     |
//! | `wifi`     | ConnectivityPort   | ESP-IDF WiFi STA                |
//! |            | LinkPort           | via `LinkSignal`                |

pub mod delay;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
