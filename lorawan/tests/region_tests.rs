use lorawan_stack::{
    config::{DeviceClass, SecurityConfig, SessionKeys},
    event::EventLink,
    hal::{IrqFlags, TimerId},
    lorawan::region::{DataRate, FixedPlan, RegionId},
    session::{Session, State},
};

use mock::{board, network};

fn otaa() -> SecurityConfig {
    SecurityConfig::new_otaa([0x01; 8], [0x02; 8], [0x03; 16])
}

fn abp_keys() -> SessionKeys {
    SessionKeys {
        dev_addr: 0x2601_1234,
        nwk_s_key: [0x11; 16],
        app_s_key: [0x22; 16],
    }
}

#[test]
fn test_us915_join_uses_sub_band() {
    let link: EventLink = EventLink::with_irq_queue();
    let mut plan = FixedPlan::new();
    plan.set_sub_band(1);
    let mut session = Session::new(&link, board(), plan, RegionId::US915);
    session.init(DeviceClass::A, otaa()).unwrap();

    for _ in 0..9 {
        session.join().unwrap();
        session.radio_irq(IrqFlags::TX_DONE).unwrap();
        session.radio_irq(IrqFlags::RX_TIMEOUT).unwrap();
        session.radio_irq(IrqFlags::RX_TIMEOUT).unwrap();
        session.task().unwrap();
        assert_eq!(session.state(), State::Idle);
    }

    let channels = &session.hal().radio.channels;
    let freqs: Vec<u32> = channels.iter().map(|c| c.frequency).collect();
    assert_eq!(freqs[0], 903_900_000);
    assert_eq!(freqs[7], 905_300_000);
    assert_eq!(freqs[8], 904_600_000);
    assert_eq!(channels[8].data_rate, DataRate::SF8BW500);
    assert_eq!(session.hal().storage.nonce, 9);
}

#[test]
fn test_us915_rx2_window() {
    let link: EventLink = EventLink::with_irq_queue();
    let mut session = Session::new(&link, board(), FixedPlan::new(), RegionId::US915);
    session.init(DeviceClass::C, otaa()).unwrap();
    session.join().unwrap();

    session.radio_irq(IrqFlags::TX_DONE).unwrap();
    session.radio_irq(IrqFlags::RX_TIMEOUT).unwrap();
    session.timer_expired(TimerId::Rx2).unwrap();
    session.task().unwrap();

    let rx2 = session.hal().radio.channels.last().copied().unwrap();
    assert_eq!(rx2.frequency, 923_300_000);
    assert_eq!(rx2.data_rate, DataRate::SF12BW500);
}

#[test]
fn test_fixed_plan_rejects_eu868() {
    let link: EventLink = EventLink::with_irq_queue();
    let mut session = Session::new(&link, board(), FixedPlan::new(), RegionId::EU868);
    assert!(session.init(DeviceClass::A, otaa()).is_err());
    assert_eq!(session.state(), State::Fault);
}

#[test]
fn test_us915_link_adr_selects_500k_channel() {
    let link: EventLink = EventLink::with_irq_queue();
    let keys = abp_keys();
    let mut session = Session::new(&link, board(), FixedPlan::new(), RegionId::US915);
    session.region_mut().set_sub_band(1);
    session
        .init(
            DeviceClass::A,
            SecurityConfig::new_abp(keys.dev_addr, keys.nwk_s_key, keys.app_s_key),
        )
        .unwrap();

    session.send_frame(1, b"ping", false).unwrap();
    session.radio_irq(IrqFlags::TX_DONE).unwrap();
    session.radio_irq(IrqFlags::RX_TIMEOUT).unwrap();
    session.task().unwrap();

    // All 125 kHz channels off, only 500 kHz channel 64 on
    let req = [0x03, 0x00, 0x01, 0x00, 0x70];
    let frame = network::data_down(&keys, 0, false, &req, None, &[]);
    session.hal_mut().radio.set_rx_data(&frame);
    session.radio_irq(IrqFlags::RX_DONE).unwrap();
    session.task().unwrap();
    assert_eq!(session.state(), State::Idle);

    session.send_frame(1, b"x", false).unwrap();
    let tx = session.hal().radio.last_tx().unwrap();
    assert_eq!(&tx[8..10], &[0x03, 0x07]);
    let channel = session.hal().radio.channels.last().copied().unwrap();
    assert_eq!(channel.frequency, 903_000_000);
    assert_eq!(channel.data_rate, DataRate::SF8BW500);
}
