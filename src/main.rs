//! Telemetry Link Main Application
//!
//! Entry point for the LoRa telemetry link firmware. Initializes hardware,
//! brings the radio session up, and runs the role this build was compiled
//! for: the ground-station receiver or the flight transmitter.

#![no_std]
#![no_main]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig};
use embassy_stm32::{bind_interrupts, peripherals};
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use lora_telemetry::drivers::sensors::{Bme280, Mpu6050, NmeaGps};
use lora_telemetry::drivers::sx127x::Sx127x;
use lora_telemetry::hal::gpio::StatusLed;
use lora_telemetry::hal::time::BlockingDelay;
use lora_telemetry::link::aggregator::{Sensor, TelemetryAggregator};
use lora_telemetry::link::driver::RadioDriver;
use lora_telemetry::link::runner::{CycleOutcome, TransmitterLink};
use lora_telemetry::prelude::*;

// Bind interrupt handlers
bind_interrupts!(struct Irqs {
    USART1 => embassy_stm32::usart::BufferedInterruptHandler<peripherals::USART1>;
});

/// Completion flag shared between the DIO0 edge task and the session
static RX_DONE: CompletionSignal = CompletionSignal::new();

static GPS_TX_BUF: StaticCell<[u8; 32]> = StaticCell::new();
static GPS_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Telemetry link firmware v{}", env!("CARGO_PKG_VERSION"));

    let p = embassy_stm32::init(embassy_stm32::Config::default());
    info!("Peripherals initialized, role {}", ROLE);

    let mut led = StatusLed::new(Output::new(p.PB3, Level::Low, Speed::Low));

    // SX127x on SPI1 with dedicated chip select and reset
    let mut spi_config = spi::Config::default();
    spi_config.frequency = Hertz(RADIO_SPI_HZ);
    let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
    let radio_cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let radio_reset = Output::new(p.PA3, Level::High, Speed::Low);
    let spi_device = ExclusiveDevice::new(spi, radio_cs, embassy_time::Delay).unwrap();
    let radio = Sx127x::new(spi_device, radio_reset, embassy_time::Delay);

    let session = RadioSession::new(radio, &RX_DONE);
    let config = link_config();
    info!("[radio] initializing: {}", config);

    match ROLE {
        Role::Receiver => {
            let mut session = session;
            if let Err(e) = session.begin(&config) {
                report_init_failure_forever(e, led).await;
            }
            info!("[radio] up");
            led.on();

            let dio0 = ExtiInput::new(p.PB0, p.EXTI0, Pull::Down);
            spawner.spawn(completion_pump(dio0, &RX_DONE)).unwrap();
            run_receiver(session, &RX_DONE, led).await
        }
        Role::Transmitter => {
            // Sensor bus: IMU and environmental sensor share I2C1
            let i2c_bus = RefCell::new(I2c::new_blocking(
                p.I2C1,
                p.PB6,
                p.PB7,
                Hertz(I2C_FREQUENCY_HZ),
                Default::default(),
            ));
            let imu = Mpu6050::new(RefCellDevice::new(&i2c_bus), IMU_I2C_ADDR);
            let env = Bme280::new(RefCellDevice::new(&i2c_bus), ENV_I2C_ADDR);

            let mut uart_config = UartConfig::default();
            uart_config.baudrate = GPS_BAUD;
            let uart = BufferedUart::new(
                p.USART1,
                Irqs,
                p.PA10,
                p.PA9,
                GPS_TX_BUF.init([0; 32]),
                GPS_RX_BUF.init([0; 256]),
                uart_config,
            )
            .unwrap();
            let (_gps_tx, gps_rx) = uart.split();
            let gps = NmeaGps::new(gps_rx);

            let aggregator = TelemetryAggregator::new(gps, imu, env);
            run_transmitter(session, aggregator, &config, led).await
        }
    }
}

/// Relay DIO0 rising edges into the completion signal.
///
/// This is the interrupt side of the interrupt-to-poll handoff: the EXTI
/// wake runs outside the link's control flow and does nothing but raise
/// the flag.
#[embassy_executor::task]
async fn completion_pump(mut dio0: ExtiInput<'static>, signal: &'static CompletionSignal) {
    loop {
        dio0.wait_for_rising_edge().await;
        signal.raise();
    }
}

/// Halt in a reporting loop after a fatal init failure.
///
/// No operator in the field: keep naming the fault rather than mask it by
/// limping on with a dead radio.
async fn report_init_failure_forever(error: InitError, mut led: StatusLed<'_>) -> ! {
    led.off();
    loop {
        error!("init failed: {}", error);
        Timer::after_secs(2).await;
    }
}

/// Ground-station cycle: listen, decode, report.
///
/// The completion wait is paced with async timers so the edge task stays
/// scheduled; a timed-out cycle aborts the armed receive and starts over.
/// Durable logging attaches where the board provides a `StorageDriver`
/// implementation for its medium.
async fn run_receiver<D: RadioDriver>(
    mut session: RadioSession<D>,
    signal: &'static CompletionSignal,
    mut led: StatusLed<'_>,
) -> ! {
    loop {
        match session.start_receive() {
            Ok(()) => {
                debug!("[radio] listening");
                let mut waited_ms: u32 = 0;
                let completed = loop {
                    if signal.poll_and_consume() {
                        break true;
                    }
                    if waited_ms >= RECEIVE_WAIT_TIMEOUT_MS {
                        break false;
                    }
                    Timer::after_millis(u64::from(COMPLETION_POLL_INTERVAL_MS)).await;
                    waited_ms += COMPLETION_POLL_INTERVAL_MS;
                };

                if completed {
                    match session.read_data() {
                        Ok(packet) => {
                            led.toggle();
                            let text =
                                core::str::from_utf8(packet.as_bytes()).unwrap_or("<binary>");
                            info!("[radio] packet #{=u32}: {=str}", session.sequence(), text);
                        }
                        Err(e) => warn!("[radio] read failed: {}", e),
                    }
                } else {
                    session.abort_receive();
                    warn!("[radio] receive timed out");
                }
            }
            Err(e) => warn!("[radio] arm failed: {}", e),
        }

        Timer::after_millis(u64::from(CYCLE_INTERVAL_MS)).await;
    }
}

/// Flight cycle: collect, transmit, report.
async fn run_transmitter<D, P, I, E>(
    session: RadioSession<D>,
    aggregator: TelemetryAggregator<P, I, E>,
    config: &LinkConfig,
    mut led: StatusLed<'_>,
) -> !
where
    D: RadioDriver,
    P: Sensor,
    I: Sensor,
    E: Sensor,
{
    let mut link = TransmitterLink::new(session, aggregator, BlockingDelay);
    match link.begin(config) {
        Ok(degraded) => {
            for id in &degraded {
                warn!("[sensors] {} did not initialize", id);
            }
        }
        Err(e) => report_init_failure_forever(e, led).await,
    }
    info!("[radio] up");
    led.on();

    loop {
        match link.run_cycle() {
            CycleOutcome::Transmitted { len } => {
                led.toggle();
                info!("[radio] transmitted {=usize} bytes", len);
            }
            outcome => warn!("[radio] {}", outcome),
        }
    }
}
