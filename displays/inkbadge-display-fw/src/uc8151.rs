//! UC8151 E-Paper Driver
//!
//! Driver for the 296x128 UC8151 panel on the Badger 2040, over SPI.
//! The panel is natively portrait (128 gates x 296 sources); landscape
//! framebuffers are rotated while streaming.
//!
//! Normal refreshes use the waveform stored in the controller's OTP, which
//! cycles every pixel and clears ghosting. Fast refreshes load short
//! register LUTs that only nudge pixels towards their new state.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::spi::SpiBus;
use embassy_time::{with_timeout, Duration, Timer};

use inkbadge_display::{Framebuffer, RefreshMode};
use inkbadge_protocol::{MAX_IMAGE_BYTES, PANEL_HEIGHT, PANEL_WIDTH};

/// Bytes per panel column (landscape x)
const COLUMN_BYTES: usize = PANEL_HEIGHT / 8;

/// Longest a full OTP refresh is allowed to take
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// UC8151 commands
#[allow(dead_code)]
mod cmd {
    pub const PSR: u8 = 0x00;
    pub const PWR: u8 = 0x01;
    pub const POF: u8 = 0x02;
    pub const PFS: u8 = 0x03;
    pub const PON: u8 = 0x04;
    pub const BTST: u8 = 0x06;
    pub const DSLP: u8 = 0x07;
    pub const DTM1: u8 = 0x10;
    pub const DSP: u8 = 0x11;
    pub const DRF: u8 = 0x12;
    pub const DTM2: u8 = 0x13;
    pub const LUT_VCOM: u8 = 0x20;
    pub const LUT_WW: u8 = 0x21;
    pub const LUT_BW: u8 = 0x22;
    pub const LUT_WB: u8 = 0x23;
    pub const LUT_BB: u8 = 0x24;
    pub const PLL: u8 = 0x30;
    pub const TSE: u8 = 0x41;
    pub const CDI: u8 = 0x50;
    pub const TCON: u8 = 0x60;
    pub const TRES: u8 = 0x61;
    pub const PTOU: u8 = 0x92;
}

/// Panel setting (PSR) flags
mod psr {
    pub const RES_128X296: u8 = 0b1000_0000;
    pub const LUT_OTP: u8 = 0b0000_0000;
    pub const LUT_REG: u8 = 0b0010_0000;
    pub const FORMAT_BW: u8 = 0b0001_0000;
    pub const SCAN_UP: u8 = 0b0000_1000;
    pub const SHIFT_RIGHT: u8 = 0b0000_0100;
    pub const BOOSTER_ON: u8 = 0b0000_0010;
    pub const RESET_NONE: u8 = 0b0000_0001;

    pub const BASE: u8 = RES_128X296 | FORMAT_BW | SCAN_UP | SHIFT_RIGHT | BOOSTER_ON | RESET_NONE;
}

/// PLL frame rates
mod pll {
    pub const HZ_100: u8 = 0b0011_1010;
    pub const HZ_200: u8 = 0b0011_1001;
}

/// Fast refresh waveform: VCOM then WW/BW/WB/BB
const FAST_LUT_VCOM: [u8; 44] = lut([
    0x00, 0x04, 0x04, 0x07, 0x00, 0x01, //
    0x00, 0x0c, 0x0c, 0x00, 0x00, 0x02, //
    0x00, 0x04, 0x04, 0x07, 0x00, 0x02, //
]);
const FAST_LUT_TO_WHITE: [u8; 42] = lut([
    0x54, 0x04, 0x04, 0x07, 0x00, 0x01, //
    0x60, 0x0c, 0x0c, 0x00, 0x00, 0x02, //
    0xa8, 0x04, 0x04, 0x07, 0x00, 0x02, //
]);
const FAST_LUT_TO_BLACK: [u8; 42] = lut([
    0xa8, 0x04, 0x04, 0x07, 0x00, 0x01, //
    0x60, 0x0c, 0x0c, 0x00, 0x00, 0x02, //
    0x54, 0x04, 0x04, 0x07, 0x00, 0x02, //
]);

/// Zero-pad three LUT groups to a full register table
const fn lut<const N: usize>(groups: [u8; 18]) -> [u8; N] {
    let mut table = [0u8; N];
    let mut i = 0;
    while i < groups.len() {
        table[i] = groups[i];
        i += 1;
    }
    table
}

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Uc8151Error {
    /// SPI transfer failed
    Spi,
    /// Control pin could not be driven
    Pin,
    /// Panel stayed busy past the timeout
    BusyTimeout,
}

/// UC8151 e-paper driver
pub struct Uc8151<SPI, CS, DC, RST, BUSY> {
    spi: SPI,
    cs: CS,
    dc: DC,
    rst: RST,
    busy: BUSY,
    /// Panel-ordered copy of the framebuffer (column-major, set = white)
    buffer: [u8; MAX_IMAGE_BYTES],
}

impl<SPI, CS, DC, RST, BUSY> Uc8151<SPI, CS, DC, RST, BUSY>
where
    SPI: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: Wait,
{
    /// Create a new UC8151 driver
    pub fn new(spi: SPI, cs: CS, dc: DC, rst: RST, busy: BUSY) -> Self {
        Self {
            spi,
            cs,
            dc,
            rst,
            busy,
            buffer: [0xFF; MAX_IMAGE_BYTES],
        }
    }

    /// Reset and configure the panel
    pub async fn init(&mut self) -> Result<(), Uc8151Error> {
        self.rst.set_low().map_err(|_| Uc8151Error::Pin)?;
        Timer::after_millis(10).await;
        self.rst.set_high().map_err(|_| Uc8151Error::Pin)?;
        Timer::after_millis(10).await;
        self.wait_idle().await?;

        self.command(cmd::PSR, &[psr::BASE | psr::LUT_OTP]).await?;
        // Internal VDS/VDG, VCOM_VD, +-11V source levels
        self.command(cmd::PWR, &[0x03, 0x00, 0x2b, 0x2b, 0x2b]).await?;
        self.command(cmd::PON, &[]).await?;
        self.wait_idle().await?;

        // 10ms soft start, strength 3, 6.58us off time on all phases
        self.command(cmd::BTST, &[0x17, 0x17, 0x17]).await?;
        self.command(cmd::PFS, &[0x00]).await?;
        self.command(cmd::TSE, &[0x00]).await?;
        self.command(cmd::TCON, &[0x22]).await?;
        self.command(cmd::CDI, &[0b0101_1100]).await?;
        self.command(cmd::PLL, &[pll::HZ_100]).await?;
        self.command(
            cmd::TRES,
            &[PANEL_HEIGHT as u8, (PANEL_WIDTH >> 8) as u8, PANEL_WIDTH as u8],
        )
        .await?;

        self.command(cmd::POF, &[]).await?;
        self.wait_idle().await
    }

    /// Stream `frame` to the panel and refresh it
    ///
    /// Returns once the refresh has fully completed.
    pub async fn update(
        &mut self,
        frame: &Framebuffer,
        mode: RefreshMode,
    ) -> Result<(), Uc8151Error> {
        self.rotate_into_buffer(frame);
        self.set_waveform(mode).await?;

        self.command(cmd::PON, &[]).await?;
        self.wait_idle().await?;
        self.command(cmd::PTOU, &[]).await?;

        self.begin(cmd::DTM2).await?;
        self.spi.write(&self.buffer).await.map_err(|_| Uc8151Error::Spi)?;
        self.end().await?;

        self.command(cmd::DSP, &[]).await?;
        self.command(cmd::DRF, &[]).await?;
        self.wait_idle().await?;

        self.command(cmd::POF, &[]).await?;
        self.wait_idle().await
    }

    /// Put the controller into deep sleep; needs `init` to wake
    #[allow(dead_code)]
    pub async fn sleep(&mut self) -> Result<(), Uc8151Error> {
        self.command(cmd::DSLP, &[0xA5]).await
    }

    async fn set_waveform(&mut self, mode: RefreshMode) -> Result<(), Uc8151Error> {
        match mode {
            RefreshMode::Normal => {
                self.command(cmd::PSR, &[psr::BASE | psr::LUT_OTP]).await?;
                self.command(cmd::PLL, &[pll::HZ_100]).await
            }
            RefreshMode::Fast => {
                self.command(cmd::PSR, &[psr::BASE | psr::LUT_REG]).await?;
                self.command(cmd::LUT_VCOM, &FAST_LUT_VCOM).await?;
                self.command(cmd::LUT_WW, &FAST_LUT_TO_WHITE).await?;
                self.command(cmd::LUT_BW, &FAST_LUT_TO_WHITE).await?;
                self.command(cmd::LUT_WB, &FAST_LUT_TO_BLACK).await?;
                self.command(cmd::LUT_BB, &FAST_LUT_TO_BLACK).await?;
                self.command(cmd::PLL, &[pll::HZ_200]).await
            }
        }
    }

    /// Landscape row-major (set = ink) to panel column-major (set = white)
    fn rotate_into_buffer(&mut self, frame: &Framebuffer) {
        for x in 0..PANEL_WIDTH {
            for group in 0..COLUMN_BYTES {
                let mut byte = 0u8;
                for bit in 0..8 {
                    if !frame.is_ink(x, group * 8 + bit) {
                        byte |= 0x80 >> bit;
                    }
                }
                self.buffer[x * COLUMN_BYTES + group] = byte;
            }
        }
    }

    /// Send a command byte followed by its data
    async fn command(&mut self, command: u8, data: &[u8]) -> Result<(), Uc8151Error> {
        self.begin(command).await?;
        if !data.is_empty() {
            self.spi.write(data).await.map_err(|_| Uc8151Error::Spi)?;
        }
        self.end().await
    }

    /// Select the chip and send a command byte, leaving DC in data mode
    async fn begin(&mut self, command: u8) -> Result<(), Uc8151Error> {
        self.cs.set_low().map_err(|_| Uc8151Error::Pin)?;
        self.dc.set_low().map_err(|_| Uc8151Error::Pin)?;
        self.spi.write(&[command]).await.map_err(|_| Uc8151Error::Spi)?;
        self.spi.flush().await.map_err(|_| Uc8151Error::Spi)?;
        self.dc.set_high().map_err(|_| Uc8151Error::Pin)
    }

    async fn end(&mut self) -> Result<(), Uc8151Error> {
        self.spi.flush().await.map_err(|_| Uc8151Error::Spi)?;
        self.cs.set_high().map_err(|_| Uc8151Error::Pin)
    }

    /// BUSY is low while the controller works
    async fn wait_idle(&mut self) -> Result<(), Uc8151Error> {
        match with_timeout(BUSY_TIMEOUT, self.busy.wait_for_high()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Uc8151Error::Pin),
            Err(_) => Err(Uc8151Error::BusyTimeout),
        }
    }
}
