//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions and the servo LEDC timer/channel using raw
//! ESP-IDF sys calls.  Called once from `main()` before the loops start.
//!
//! The pin handles returned here ([`GpioOutput`], [`LedcChannel`]) implement
//! the `embedded-hal` output traits, so drivers stay generic and can be
//! exercised on the host with in-memory fakes.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::UartInitFailed(rc)   => write!(f, "UART driver install failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

/// Register write rejected by the driver (raw `esp_err_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWriteError(pub i32);

impl embedded_hal::digital::Error for PinWriteError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl embedded_hal::pwm::Error for PinWriteError {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}

/// Handles to every output configured at boot.
pub struct Peripherals {
    pub light: GpioOutput,
    pub alarm: GpioOutput,
    pub servo: LedcChannel,
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<Peripherals, HwInitError> {
    // SAFETY: Called once from main() before the loops start; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(Peripherals {
        light: GpioOutput::new(pins::LIGHT_GPIO),
        alarm: GpioOutput::new(pins::ALARM_GPIO),
        servo: LedcChannel::new(LEDC_CH_SERVO),
    })
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<Peripherals, HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(Peripherals {
        light: GpioOutput::new(pins::LIGHT_GPIO),
        alarm: GpioOutput::new(pins::ALARM_GPIO),
        servo: LedcChannel::new(LEDC_CH_SERVO),
    })
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [pins::LIGHT_GPIO, pins::ALARM_GPIO];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured (light={}, alarm={})", pins::LIGHT_GPIO, pins::ALARM_GPIO);
    Ok(())
}

/// Push-pull output configured by [`init_peripherals`].
#[derive(Debug)]
pub struct GpioOutput {
    pin: i32,
    #[cfg(not(target_os = "espidf"))]
    level: bool,
}

impl GpioOutput {
    fn new(pin: i32) -> Self {
        Self {
            pin,
            #[cfg(not(target_os = "espidf"))]
            level: false,
        }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    /// Simulation: last level written.
    #[cfg(not(target_os = "espidf"))]
    pub fn level(&self) -> bool {
        self.level
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), PinWriteError> {
        // SAFETY: gpio_set_level writes to an already-configured output pin;
        // each pin handle is owned by exactly one driver.
        let ret = unsafe { gpio_set_level(self.pin, u32::from(high)) };
        if ret != ESP_OK as i32 {
            return Err(PinWriteError(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), PinWriteError> {
        self.level = high;
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for GpioOutput {
    type Error = PinWriteError;
}

impl embedded_hal::digital::OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

// ── LEDC PWM ─────────────────────────────────────────────────

pub const LEDC_CH_SERVO: u32 = 0;

/// Full-scale duty at the servo timer's resolution.
pub const SERVO_MAX_DUTY: u16 = ((1u32 << pins::SERVO_PWM_RESOLUTION_BITS) - 1) as u16;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: servo (50 Hz, 14-bit)
    // SAFETY: Called from single main-task context via init_peripherals().
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_14_BIT,
        freq_hz: pins::SERVO_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    // Channel 0: servo signal, idle low until the first angle is written
    let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_SERVO,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: pins::SERVO_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    }) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    info!("hw_init: LEDC configured (servo=CH0 on GPIO {}, {} Hz)", pins::SERVO_GPIO, pins::SERVO_PWM_FREQ_HZ);
    Ok(())
}

/// One LEDC channel configured by [`init_peripherals`].
#[derive(Debug)]
pub struct LedcChannel {
    channel: u32,
    duty: u16,
}

impl LedcChannel {
    fn new(channel: u32) -> Self {
        Self { channel, duty: 0 }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// Last duty written.
    pub fn duty(&self) -> u16 {
        self.duty
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, duty: u16) -> Result<(), PinWriteError> {
        // SAFETY: the channel was configured in init_ledc(); the handle is
        // owned by exactly one driver so duty writes never race.
        unsafe {
            let ret = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel, u32::from(duty));
            if ret != ESP_OK as i32 {
                return Err(PinWriteError(ret));
            }
            let ret = ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel);
            if ret != ESP_OK as i32 {
                return Err(PinWriteError(ret));
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, _duty: u16) -> Result<(), PinWriteError> {
        Ok(())
    }
}

impl embedded_hal::pwm::ErrorType for LedcChannel {
    type Error = PinWriteError;
}

impl embedded_hal::pwm::SetDutyCycle for LedcChannel {
    fn max_duty_cycle(&self) -> u16 {
        SERVO_MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let duty = duty.min(SERVO_MAX_DUTY);
        self.write(duty)?;
        self.duty = duty;
        Ok(())
    }
}
