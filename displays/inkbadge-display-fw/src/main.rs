//! Inkbadge Display Firmware
//!
//! Receiver firmware for the Pimoroni Badger 2040 (RP2040 + UC8151).
//! Reads frames from the host over USB CDC-ACM and paints them on the
//! e-paper panel.

#![no_std]
#![no_main]

mod uc8151;

use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{SPI0, USB};
use embassy_rp::spi::{self, Spi};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_time::{with_timeout, Duration};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use inkbadge_display::{Framebuffer, Outcome, Receiver, RefreshCounter, RefreshMode};

use crate::uc8151::Uc8151;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
});

type Panel = Uc8151<
    Spi<'static, SPI0, spi::Async>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
    Input<'static>,
>;

type Link = CdcAcmClass<'static, Driver<'static, USB>>;

/// Receive poll interval; painting happens between polls
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// USB full-speed bulk packet size
const PACKET_SIZE: u16 = 64;

// Static cells for USB descriptors and the receiver (must live forever)
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE: StaticCell<State> = StaticCell::new();
static RECEIVER: StaticCell<Receiver<Framebuffer>> = StaticCell::new();

/// Host went away mid-read
struct Disconnected;

impl From<EndpointError> for Disconnected {
    fn from(e: EndpointError) -> Self {
        match e {
            EndpointError::BufferOverflow => defmt::panic!("USB packet larger than buffer"),
            EndpointError::Disabled => Disconnected,
        }
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Inkbadge display firmware starting...");

    let p = embassy_rp::init(Default::default());

    // Badger 2040 3V3 rail enable; held for the lifetime of main
    let _power = Output::new(p.PIN_10, Level::High);

    // Panel on SPI0 (GP18=SCK, GP19=MOSI, GP17=CS, GP20=DC, GP21=RST, GP26=BUSY)
    let mut spi_config = spi::Config::default();
    spi_config.frequency = 12_000_000;
    let spi = Spi::new_txonly(p.SPI0, p.PIN_18, p.PIN_19, p.DMA_CH0, spi_config);

    let mut panel: Panel = Uc8151::new(
        spi,
        Output::new(p.PIN_17, Level::High),
        Output::new(p.PIN_20, Level::High),
        Output::new(p.PIN_21, Level::High),
        Input::new(p.PIN_26, Pull::Up),
    );

    let receiver = RECEIVER.init_with(|| {
        Receiver::new(Framebuffer::new(), RefreshCounter::default())
    });

    if let Err(e) = panel.init().await {
        error!("Failed to initialize panel: {:?}", e);
    } else {
        info!("Panel initialized");
        let Ok(mode) = receiver.start();
        refresh(&mut panel, receiver, mode).await;
    }

    // USB CDC-ACM link to the host
    let driver = Driver::new(p.USB, Irqs);
    let mut usb_config = UsbConfig::new(0x2e8a, 0x0003);
    usb_config.manufacturer = Some("Pimoroni");
    usb_config.product = Some("Badger 2040 inkbadge");
    usb_config.serial_number = Some("inkbadge");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );
    let mut link: Link = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), PACKET_SIZE);
    let mut usb = builder.build();

    info!("USB link ready");

    let receive = async {
        loop {
            link.wait_connection().await;
            info!("Host connected");
            let Err(Disconnected) = serve(&mut link, receiver, &mut panel).await;
            warn!("Host disconnected");
        }
    };

    join(usb.run(), receive).await;
}

/// Feed link bytes to the receiver until the host disconnects
async fn serve(
    link: &mut Link,
    receiver: &mut Receiver<Framebuffer>,
    panel: &mut Panel,
) -> Result<core::convert::Infallible, Disconnected> {
    let mut packet = [0u8; PACKET_SIZE as usize];

    loop {
        let n = match with_timeout(POLL_TIMEOUT, link.read_packet(&mut packet)).await {
            Ok(read) => read?,
            Err(_) => continue,
        };

        for &byte in &packet[..n] {
            let Ok(outcome) = receiver.feed(byte);
            match outcome {
                Outcome::Pending => {}
                Outcome::Painted(mode) => {
                    debug!("Image frame ({} since full refresh)", receiver.counter().count());
                    refresh(panel, receiver, mode).await;
                }
                Outcome::LegacyShown(mode) => {
                    debug!("Legacy frame");
                    refresh(panel, receiver, mode).await;
                }
                Outcome::Dropped(e) => warn!("Dropped frame: {:?}", e),
                Outcome::Ignored => trace!("Ignored line"),
            }
        }
    }
}

/// Push the receiver's framebuffer to the panel; blocks input until done
async fn refresh(panel: &mut Panel, receiver: &Receiver<Framebuffer>, mode: RefreshMode) {
    if let Err(e) = panel.update(receiver.display(), mode).await {
        error!("Panel update failed: {:?}", e);
    } else {
        trace!("Panel updated ({:?})", mode);
    }
}
