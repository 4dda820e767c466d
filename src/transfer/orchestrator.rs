// Transfer orchestrator
//
// Drives a whole codeplug transfer through its phases and owns the
// state machine: Idle -> Download | Upload | UploadCallsigns ->
// Idle | Error. On any failure the radio is rebooted and the
// connection closed; there is no retry and no cancellation.

use super::device::{Device, DeviceIdent};
use super::{Result, TransferError};
use crate::config::Config;
use crate::image::Image;
use crate::radios::{radio_info_for_ident, Codeplug};
use std::sync::mpsc;
use std::thread;
use tracing::{info, warn};

const CALLSIGN_WRITE_BLOCK: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Download,
    Upload,
    UploadCallsigns,
    Error,
}

/// Events delivered over the channel in non-blocking mode.
#[derive(Debug)]
pub enum Event {
    /// Percent complete, monotone within each phase.
    Progress(u8),
    Downloaded(Box<Config>),
    Uploaded,
    Failed(String),
}

pub struct Orchestrator<D: Device> {
    device: D,
    state: State,
}

fn phase_progress(lo: u8, hi: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return hi;
    }
    lo + ((hi - lo) as usize * done / total) as u8
}

fn verify_model(ident: &DeviceIdent, expected: &str) -> Result<()> {
    if ident.model == expected {
        return Ok(());
    }
    match radio_info_for_ident(&ident.model) {
        Some(info) if info.model == expected => Ok(()),
        Some(info) => Err(TransferError::WrongRadio {
            expected: expected.to_string(),
            found: info.full_name(),
        }),
        None => Err(TransferError::WrongRadio {
            expected: expected.to_string(),
            found: ident.model.clone(),
        }),
    }
}

/// Read every element from `from` onward into the image, mapping byte
/// progress onto `lo..hi`.
fn read_elements<D: Device>(
    device: &mut D,
    image: &mut Image,
    from: usize,
    lo: u8,
    hi: u8,
    progress: &mut dyn FnMut(u8),
) -> Result<()> {
    let total: usize = (from..image.num_elements())
        .filter_map(|i| image.element(i))
        .map(|e| e.len())
        .sum();
    let mut done = 0;
    for i in from..image.num_elements() {
        let Some(element) = image.element_mut(i) else {
            continue;
        };
        let address = element.address();
        device.read(0, address, element.data_mut())?;
        done += element.len();
        progress(phase_progress(lo, hi, done, total));
    }
    Ok(())
}

/// Write every element in address order, mapping byte progress onto
/// `lo..hi`.
fn write_elements<D: Device>(
    device: &mut D,
    image: &Image,
    lo: u8,
    hi: u8,
    progress: &mut dyn FnMut(u8),
) -> Result<()> {
    let total = image.total_size();
    let mut done = 0;
    for element in image.elements() {
        device.write(0, element.address(), element.data())?;
        done += element.len();
        progress(phase_progress(lo, hi, done, total));
    }
    Ok(())
}

impl<D: Device> Orchestrator<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn fail(&mut self, error: &TransferError) {
        warn!("transfer failed: {}", error);
        if let Err(e) = self.device.reboot() {
            warn!("reboot after failure failed too: {}", e);
        }
        if let Err(e) = self.device.close() {
            warn!("closing device failed: {}", e);
        }
        self.state = State::Error;
    }

    /// Read the radio's codeplug and decode it.
    pub fn download(
        &mut self,
        codeplug: &mut dyn Codeplug,
        progress: &mut dyn FnMut(u8),
    ) -> Result<Config> {
        self.state = State::Download;
        match self.try_download(codeplug, progress) {
            Ok(config) => {
                self.state = State::Idle;
                Ok(config)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn try_download(
        &mut self,
        codeplug: &mut dyn Codeplug,
        progress: &mut dyn FnMut(u8),
    ) -> Result<Config> {
        let ident = self.device.open()?;
        verify_model(&ident, codeplug.model())?;
        info!("downloading from {} ({})", ident.model, ident.firmware);

        codeplug.allocate_bitmaps()?;
        codeplug.image().check_aligned(codeplug.read_block_size())?;
        let bitmaps = codeplug.image().num_elements();
        read_elements(&mut self.device, codeplug.image_mut(), 0, 0, 10, progress)?;

        codeplug.allocate_for_decoding()?;
        codeplug.image().check_aligned(codeplug.read_block_size())?;
        read_elements(
            &mut self.device,
            codeplug.image_mut(),
            bitmaps,
            10,
            100,
            progress,
        )?;

        self.device.close()?;
        Ok(codeplug.decode()?)
    }

    /// Encode the configuration and write it to the radio, preserving
    /// device-only settings via a read-modify-write of the updated
    /// sections.
    pub fn upload(
        &mut self,
        codeplug: &mut dyn Codeplug,
        config: &Config,
        progress: &mut dyn FnMut(u8),
    ) -> Result<()> {
        self.state = State::Upload;
        match self.try_upload(codeplug, config, progress) {
            Ok(()) => {
                self.state = State::Idle;
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn try_upload(
        &mut self,
        codeplug: &mut dyn Codeplug,
        config: &Config,
        progress: &mut dyn FnMut(u8),
    ) -> Result<()> {
        let ident = self.device.open()?;
        verify_model(&ident, codeplug.model())?;
        info!("uploading to {} ({})", ident.model, ident.firmware);

        codeplug.allocate_bitmaps()?;
        codeplug.image().check_aligned(codeplug.read_block_size())?;
        let bitmaps = codeplug.image().num_elements();
        read_elements(&mut self.device, codeplug.image_mut(), 0, 0, 25, progress)?;

        codeplug.allocate_updated()?;
        codeplug.image().check_aligned(codeplug.read_block_size())?;
        read_elements(
            &mut self.device,
            codeplug.image_mut(),
            bitmaps,
            25,
            50,
            progress,
        )?;

        codeplug.allocate_for_encoding(config)?;
        codeplug.encode(config)?;
        codeplug.image().check_aligned(codeplug.write_block_size())?;
        write_elements(&mut self.device, codeplug.image(), 50, 100, progress)?;

        self.device.close()
    }

    /// Write a pre-built callsign database image.
    pub fn upload_callsigns(
        &mut self,
        image: &mut Image,
        progress: &mut dyn FnMut(u8),
    ) -> Result<()> {
        self.state = State::UploadCallsigns;
        let result = self.try_upload_callsigns(image, progress);
        match result {
            Ok(()) => {
                self.state = State::Idle;
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn try_upload_callsigns(
        &mut self,
        image: &mut Image,
        progress: &mut dyn FnMut(u8),
    ) -> Result<()> {
        let ident = self.device.open()?;
        info!(
            "uploading callsign db to {} ({})",
            ident.model, ident.firmware
        );
        image.sort();
        image.check_aligned(CALLSIGN_WRITE_BLOCK)?;
        write_elements(&mut self.device, image, 0, 100, progress)?;
        self.device.close()
    }
}

/// Run a download on its own thread; the device handle moves with it.
/// Events arrive on the returned channel, `Downloaded` or `Failed`
/// last.
pub fn download_in_background<D: Device + 'static>(
    device: D,
    mut codeplug: Box<dyn Codeplug>,
) -> (thread::JoinHandle<()>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut orchestrator = Orchestrator::new(device);
        let progress_tx = tx.clone();
        let mut progress = move |p| {
            let _ = progress_tx.send(Event::Progress(p));
        };
        match orchestrator.download(codeplug.as_mut(), &mut progress) {
            Ok(config) => {
                let _ = tx.send(Event::Downloaded(Box::new(config)));
            }
            Err(e) => {
                let _ = tx.send(Event::Failed(e.to_string()));
            }
        }
    });
    (handle, rx)
}

/// Run an upload on its own thread, as [`download_in_background`].
pub fn upload_in_background<D: Device + 'static>(
    device: D,
    mut codeplug: Box<dyn Codeplug>,
    config: Config,
) -> (thread::JoinHandle<()>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut orchestrator = Orchestrator::new(device);
        let progress_tx = tx.clone();
        let mut progress = move |p| {
            let _ = progress_tx.send(Event::Progress(p));
        };
        match orchestrator.upload(codeplug.as_mut(), &config, &mut progress) {
            Ok(()) => {
                let _ = tx.send(Event::Uploaded);
            }
            Err(e) => {
                let _ = tx.send(Event::Failed(e.to_string()));
            }
        }
    });
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AnalogChannel, CallKind, Channel, Contact, DigitalChannel, DmrContact, RadioId, Zone,
    };
    use crate::transfer::MockDevice;
    use crate::radios::Rd5rCodeplug;

    fn sample_config() -> Config {
        let mut config = Config::new();
        config.add_radio_id(RadioId::new("DL1XYZ", 2_621_234));
        config
            .contacts
            .push(Contact::Dmr(DmrContact::new(CallKind::Group, "WW", 91)));

        let mut digital = DigitalChannel::new("R0 Berlin");
        digital.base.rx_frequency = 439_575_000;
        digital.base.tx_frequency = 431_975_000;
        digital.tx_contact = Some(0);
        config.channels.push(Channel::Digital(digital));

        let mut analog = AnalogChannel::new("Simplex");
        analog.base.rx_frequency = 145_500_000;
        analog.base.tx_frequency = 145_500_000;
        config.channels.push(Channel::Analog(analog));

        let mut zone = Zone::new("Home");
        zone.a = vec![0, 1];
        config.zones.push(zone);
        config
    }

    fn device_with_codeplug(config: &Config) -> MockDevice {
        let mut cp = Rd5rCodeplug::new();
        cp.allocate_for_encoding(config).unwrap();
        cp.encode(config).unwrap();
        let mut device = MockDevice::new("BF-5R");
        device.load_image(cp.image());
        device
    }

    #[test]
    fn test_download_phases() {
        let device = device_with_codeplug(&sample_config());
        let mut orchestrator = Orchestrator::new(device);
        assert_eq!(orchestrator.state(), State::Idle);

        let mut seen: Vec<u8> = Vec::new();
        let mut cp = Rd5rCodeplug::new();
        let config = orchestrator
            .download(&mut cp, &mut |p| seen.push(p))
            .unwrap();

        assert_eq!(orchestrator.state(), State::Idle);
        assert!(orchestrator.device().closed);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));

        assert_eq!(config.radio_ids[0].id, 2_621_234);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].name(), "R0 Berlin");
        assert_eq!(config.zones[0].a, vec![0, 1]);
    }

    #[test]
    fn test_upload_then_download() {
        let config = sample_config();
        let mut orchestrator = Orchestrator::new(MockDevice::new("BF-5R"));

        let mut seen: Vec<u8> = Vec::new();
        let mut cp = Rd5rCodeplug::new();
        orchestrator
            .upload(&mut cp, &config, &mut |p| seen.push(p))
            .unwrap();
        assert_eq!(orchestrator.state(), State::Idle);
        assert!(seen.iter().any(|&p| p <= 25));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));

        let mut cp = Rd5rCodeplug::new();
        let back = orchestrator.download(&mut cp, &mut |_| {}).unwrap();
        assert_eq!(back.contacts, config.contacts);
        assert_eq!(back.channels[1].name(), "Simplex");
    }

    #[test]
    fn test_failure_reboots_and_closes() {
        let device = MockDevice::new("BF-5R").fail_after(2);
        let mut orchestrator = Orchestrator::new(device);

        let mut cp = Rd5rCodeplug::new();
        let result = orchestrator.download(&mut cp, &mut |_| {});
        assert!(result.is_err());
        assert_eq!(orchestrator.state(), State::Error);
        assert!(orchestrator.device().rebooted);
        assert!(orchestrator.device().closed);
    }

    #[test]
    fn test_wrong_radio_rejected() {
        let device = MockDevice::new("D868UVE");
        let mut orchestrator = Orchestrator::new(device);
        let mut cp = Rd5rCodeplug::new();
        assert!(matches!(
            orchestrator.download(&mut cp, &mut |_| {}),
            Err(TransferError::WrongRadio { .. })
        ));
    }

    #[test]
    fn test_download_in_background() {
        let device = device_with_codeplug(&sample_config());
        let (handle, events) =
            download_in_background(device, Box::new(Rd5rCodeplug::new()));

        let mut last_progress = 0u8;
        let mut downloaded = None;
        for event in events {
            match event {
                Event::Progress(p) => {
                    assert!(p >= last_progress);
                    last_progress = p;
                }
                Event::Downloaded(config) => downloaded = Some(config),
                other => panic!("unexpected event {:?}", other),
            }
        }
        handle.join().unwrap();
        let config = downloaded.expect("no download result");
        assert_eq!(config.channels.len(), 2);
    }

    #[test]
    fn test_upload_callsigns_writes_image() {
        let mut image = Image::new("callsigns");
        image.add_element(0x0400_0000, 32).unwrap();
        image.data_mut(0x0400_0000).unwrap()[..4].copy_from_slice(b"call");

        let mut orchestrator = Orchestrator::new(MockDevice::new("BF-5R"));
        orchestrator
            .upload_callsigns(&mut image, &mut |_| {})
            .unwrap();
        assert_eq!(orchestrator.state(), State::Idle);
        assert_eq!(orchestrator.device().byte_at(0, 0x0400_0000), b'c');
    }
}
