//! Duty Link Self-Test Firmware
//!
//! Entry point for the STM32G474 loopback self-test.
//! Jumper PA0 (TIM2 CH1 PWM out) to PA1 (input), then watch the RTT log:
//! every few seconds a line of text is sent as duty symbols, measured back
//! and checked.

#![no_std]
#![no_main]

use core::fmt::Write as _;

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_time::Timer;
use heapless::String;
use {defmt_rtt as _, panic_probe as _};

use duty_link::config::{self, LINE_MAX};
use duty_link::hal::timer::EmbassyClock;
use duty_link::hal::{PinInput, PwmOutput};
use duty_link::prelude::*;

/// Lines cycled through by the self-test (all inside the default alphabet)
const MESSAGES: [&str; 3] = [
    "Hello duty link",
    "The quick brown fox jumps over the lazy dog.",
    "0123456789 ABCDEFGHIJKLMNOPQRSTUVWXYZ",
];

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Duty Link self-test v{}", env!("CARGO_PKG_VERSION"));

    let p = embassy_stm32::init(embassy_stm32::Config::default());

    let led = Output::new(p.PA5, Level::Low, Speed::Low);
    if spawner.spawn(heartbeat_task(led)).is_err() {
        warn!("heartbeat task not started");
    }

    let link_config = LinkConfig::alphabet_loopback();
    if let Err(e) = link_config.validate() {
        defmt::panic!("invalid link configuration: {}", e);
    }

    // TX: TIM2 CH1 on PA0
    let tx_pin = PwmPin::new_ch1(p.PA0, OutputType::PushPull);
    let pwm = SimplePwm::new(
        p.TIM2,
        Some(tx_pin),
        None,
        None,
        None,
        Hertz(link_config.pwm_frequency()),
        CountingMode::EdgeAlignedUp,
    );
    let mut channel = pwm.split().ch1;
    channel.enable();

    // RX: PA1, pulled down so an open jumper reads as a silent line
    let rx_pin = Input::new(p.PA1, Pull::Down);

    info!(
        "TX {} -> RX {} @ {} Hz, {}",
        config::pins::TX,
        config::pins::RX,
        link_config.pwm_frequency(),
        link_config
    );

    let mut driver = LinkDriver::new(
        PwmOutput::new(channel),
        PinInput::new(rx_pin),
        EmbassyClock,
        link_config,
    );

    let mut round: u32 = 0;
    loop {
        for message in MESSAGES {
            let mut line: String<LINE_MAX> = String::new();
            if write!(line, "{message} {round}").is_err() {
                warn!("message truncated");
            }

            // Busy-polls the line; the heartbeat stalls until it returns
            let report = driver.transact(line.as_bytes());
            info!("\n{}", defmt::Display2Format(&report));

            Timer::after(Duration::from_secs(2)).await;
        }
        round = round.wrapping_add(1);
    }
}

/// Heartbeat task - blinks LED to show the firmware is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}
