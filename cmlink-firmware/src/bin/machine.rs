//! Machine-room controller
//!
//! Answers the console over the serial link and owns the drive, fans,
//! incline lift and wax pump. Loss of the console puts everything in the
//! safe state.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use cmlink_core::Slave;
use cmlink_firmware::channels::{InclineCommand, SharedSlave, INCLINE_CMD};
use cmlink_firmware::clock::{millis, now};
use cmlink_firmware::machine_io::{Drive, FanRelays, MachineIo};
use cmlink_firmware::settings::load_link_config;
use cmlink_firmware::tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 512]> = StaticCell::new();

static SLAVE: StaticCell<SharedSlave> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Machine-room firmware starting...");

    let p = embassy_rp::init(Default::default());
    let config = load_link_config(p.FLASH);

    // Link UART, 115200 8N1
    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 512]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, UartConfig::default());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized for console link");

    // Drive: speed reference on GPIO4 (PWM2 A), enable, ready and presence
    let drive = Drive {
        pwm: Pwm::new_output_a(p.PWM_SLICE2, p.PIN_4, PwmConfig::default()),
        enable: Output::new(p.PIN_5, Level::Low),
        ready: Input::new(p.PIN_6, Pull::Down),
        present: Input::new(p.PIN_7, Pull::Down),
    };
    let head_fan = FanRelays::new(
        Output::new(p.PIN_16, Level::Low),
        Output::new(p.PIN_17, Level::Low),
    );
    let chest_fan = FanRelays::new(
        Output::new(p.PIN_18, Level::Low),
        Output::new(p.PIN_19, Level::Low),
    );
    let machine = MachineIo::new(drive, config.max_speed(), head_fan, chest_fan);

    let slave: &'static SharedSlave = SLAVE.init(Mutex::new(Slave::new(machine, &config, now())));

    let incline = tasks::InclineMotor {
        up: Output::new(p.PIN_21, Level::Low),
        down: Output::new(p.PIN_22, Level::Low),
        lower_limit: Input::new(p.PIN_26, Pull::Up),
    };

    spawner
        .spawn(tasks::slave_link_task(rx, tx, slave, config))
        .unwrap();
    spawner.spawn(tasks::watchdog_task(slave, config)).unwrap();
    spawner
        .spawn(tasks::wax_pump_task(
            Output::new(p.PIN_20, Level::Low),
            millis(config.wax_pump_run_ms),
        ))
        .unwrap();
    spawner.spawn(tasks::incline_task(incline)).unwrap();
    spawner
        .spawn(tasks::speed_sensor_task(
            Input::new(p.PIN_27, Pull::None),
            tasks::DEFAULT_UM_PER_PULSE,
        ))
        .unwrap();

    // Find the lower limit before accepting incline targets
    INCLINE_CMD.signal(InclineCommand::Home);

    info!("All tasks spawned, machine room running");

    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
