//! Console controller
//!
//! Owns the operator buttons and drives the machine room over the serial
//! link: receive, retry sweep and heartbeat run as separate tasks sharing
//! the master state.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use cmlink_core::Master;
use cmlink_firmware::channels::SharedMaster;
use cmlink_firmware::serial::SharedTx;
use cmlink_firmware::settings::load_link_config;
use cmlink_firmware::tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 512]> = StaticCell::new();

static MASTER: StaticCell<SharedMaster> = StaticCell::new();
static TX: StaticCell<SharedTx> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Console firmware starting...");

    let p = embassy_rp::init(Default::default());
    let config = load_link_config(p.FLASH);

    // Link UART, 115200 8N1
    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 512]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, UartConfig::default());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized for machine-room link");

    let master: &'static SharedMaster = MASTER.init(Mutex::new(Master::new(config)));
    let tx: &'static SharedTx = TX.init(Mutex::new(tx));

    let buttons = tasks::Buttons {
        speed_up: Input::new(p.PIN_10, Pull::Up),
        speed_down: Input::new(p.PIN_11, Pull::Up),
        incline_up: Input::new(p.PIN_12, Pull::Up),
        incline_down: Input::new(p.PIN_13, Pull::Up),
        stop: Input::new(p.PIN_14, Pull::Up),
        wax: Input::new(p.PIN_15, Pull::Up),
    };

    spawner.spawn(tasks::link_rx_task(rx, master, config)).unwrap();
    spawner.spawn(tasks::retry_sweep_task(master, tx, config)).unwrap();
    spawner.spawn(tasks::heartbeat_task(master, tx, config)).unwrap();
    spawner
        .spawn(tasks::controls_task(buttons, master, tx, config))
        .unwrap();

    info!("All tasks spawned, console running");

    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
