use pretty_assertions::assert_eq;

use super::Pokey;
use super::PokeyTimer;
use crate::common::constants::pokey;
use crate::common::constants::IRQ_OTHER_KEY_PRESSED;
use crate::common::constants::IRQ_TIMER_1;
use crate::common::constants::IRQ_TIMER_2;
use crate::common::scheduler::EventScheduler;
use crate::common::scheduler::TimedEvent;

fn running_pokey() -> (Pokey, EventScheduler) {
    let mut chip = Pokey::new();
    let mut scheduler = EventScheduler::new();
    chip.bus_write(pokey::SKCTL_SKSTAT, 0x03, 0, &mut scheduler);
    (chip, scheduler)
}

#[test]
fn test_register_defaults() {
    let mut chip = Pokey::new();
    assert_eq!(chip.bus_read(pokey::IRQEN_IRQST, 0), 0xFF);
    assert_eq!(chip.bus_read(pokey::SKCTL_SKSTAT, 0), 0xFF);
    assert_eq!(chip.bus_read(pokey::STIMER_KBCODE, 0), 0xFF);
    assert_eq!(chip.bus_read(pokey::AUDCTL_ALLPOT, 0), 0xFF);
    assert_eq!(chip.bus_read(pokey::AUDF1_POT0, 0), 0xFF);
    assert_eq!(chip.bus_read(0x0C, 0), 0xFF);
}

#[test]
fn test_timer_periods() {
    let (mut chip, mut scheduler) = running_pokey();
    for timer in [PokeyTimer::Timer1, PokeyTimer::Timer2, PokeyTimer::Timer4] {
        assert_eq!(chip.timer_period(timer), 0);
    }

    chip.bus_write(pokey::AUDF1_POT0, 9, 0, &mut scheduler);
    chip.bus_write(pokey::AUDF2_POT2, 1, 0, &mut scheduler);
    chip.bus_write(pokey::AUDF4_POT6, 3, 0, &mut scheduler);
    assert_eq!(chip.timer_period(PokeyTimer::Timer1), 10 * 28);
    assert_eq!(chip.timer_period(PokeyTimer::Timer2), 2 * 28);
    assert_eq!(chip.timer_period(PokeyTimer::Timer4), 4 * 28);

    // 15kHz base clock
    chip.bus_write(pokey::AUDCTL_ALLPOT, 0x01, 0, &mut scheduler);
    assert_eq!(chip.timer_period(PokeyTimer::Timer1), 10 * 114);

    // Channel 1 at CPU clock
    chip.bus_write(pokey::AUDCTL_ALLPOT, 0x40, 0, &mut scheduler);
    assert_eq!(chip.timer_period(PokeyTimer::Timer1), 13);

    // Channels 1+2 joined: timer 1 stops, timer 2 counts the 16 bit period.
    chip.bus_write(pokey::AUDCTL_ALLPOT, 0x50, 0, &mut scheduler);
    assert_eq!(chip.timer_period(PokeyTimer::Timer1), 0);
    assert_eq!(chip.timer_period(PokeyTimer::Timer2), 0x0109 + 7);
    chip.bus_write(pokey::AUDCTL_ALLPOT, 0x10, 0, &mut scheduler);
    assert_eq!(chip.timer_period(PokeyTimer::Timer2), (0x0109 + 1) * 28);

    // Timers hold while SKCTL keeps POKEY in reset.
    chip.bus_write(pokey::SKCTL_SKSTAT, 0x00, 0, &mut scheduler);
    assert_eq!(chip.timer_period(PokeyTimer::Timer2), 0);
}

#[test]
fn test_stimer_arms_timers() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.bus_write(pokey::AUDF1_POT0, 9, 0, &mut scheduler);
    chip.bus_write(pokey::STIMER_KBCODE, 0, 1000, &mut scheduler);
    assert_eq!(scheduler.get(TimedEvent::Timer1), Some(1280));
    assert_eq!(scheduler.get(TimedEvent::Timer2), None);
    assert_eq!(scheduler.get(TimedEvent::Timer4), None);
}

#[test]
fn test_timer_irq_and_reschedule() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.bus_write(pokey::AUDF1_POT0, 9, 0, &mut scheduler);
    chip.bus_write(pokey::AUDF2_POT2, 9, 0, &mut scheduler);
    chip.bus_write(pokey::IRQEN_IRQST, IRQ_TIMER_1, 0, &mut scheduler);
    chip.bus_write(pokey::STIMER_KBCODE, 0, 0, &mut scheduler);

    // Serviced late: skips whole periods until after now.
    assert!(chip.service_timer(PokeyTimer::Timer1, 600, &mut scheduler));
    assert_eq!(scheduler.get(TimedEvent::Timer1), Some(840));
    assert_eq!(chip.bus_read(pokey::IRQEN_IRQST, 600), !IRQ_TIMER_1);

    // Disabled source: no interrupt, but the status bit still drops.
    assert!(!chip.service_timer(PokeyTimer::Timer2, 280, &mut scheduler));
    assert_eq!(scheduler.get(TimedEvent::Timer2), Some(560));
    assert_eq!(chip.bus_read(pokey::IRQEN_IRQST, 600) & IRQ_TIMER_2, 0);

    // Acknowledging via IRQEN sets the status bit again.
    chip.bus_write(pokey::IRQEN_IRQST, 0x00, 600, &mut scheduler);
    assert_eq!(chip.bus_read(pokey::IRQEN_IRQST, 600), 0xFF);
}

#[test]
fn test_masked_timer_sets_status() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.bus_write(pokey::IRQEN_IRQST, 0x00, 0, &mut scheduler);
    chip.bus_write(pokey::AUDF1_POT0, 0x10, 0, &mut scheduler);
    chip.bus_write(pokey::STIMER_KBCODE, 0, 0, &mut scheduler);
    let due = scheduler.get(TimedEvent::Timer1).unwrap();

    assert!(!chip.service_timer(PokeyTimer::Timer1, due, &mut scheduler));
    assert_eq!(chip.bus_read(pokey::IRQEN_IRQST, due), 0xFE);
}

#[test]
fn test_timer_disarms_with_zero_period() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.bus_write(pokey::AUDF1_POT0, 9, 0, &mut scheduler);
    chip.bus_write(pokey::STIMER_KBCODE, 0, 0, &mut scheduler);
    chip.bus_write(pokey::AUDF1_POT0, 0, 100, &mut scheduler);
    chip.service_timer(PokeyTimer::Timer1, 280, &mut scheduler);
    assert!(!scheduler.is_armed(TimedEvent::Timer1));
}

#[test]
fn test_random() {
    let mut chip = Pokey::new();
    let mut scheduler = EventScheduler::new();
    // Held in reset
    assert_eq!(chip.bus_read(pokey::SKREST_RANDOM, 500), 0xFF);
    assert_eq!(chip.bus_read(pokey::SKREST_RANDOM, 900), 0xFF);

    chip.bus_write(pokey::SKCTL_SKSTAT, 0x03, 1000, &mut scheduler);
    // One step from 0x1FFFF is 0x1FF7F
    assert_eq!(chip.bus_read(pokey::SKREST_RANDOM, 1001), 0x7F);
    let a = chip.bus_read(pokey::SKREST_RANDOM, 1100);
    let b = chip.bus_read(pokey::SKREST_RANDOM, 1100);
    assert_eq!(a, b);
    assert_eq!(chip.bus_peek(pokey::SKREST_RANDOM), a);
}

#[test]
fn test_random_follows_audio_engine() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.enable_audio(48000, 512, 0);
    chip.bus_write(pokey::SKCTL_SKSTAT, 0x03, 0, &mut scheduler);
    let mut standalone = Pokey::new();
    standalone.bus_write(pokey::SKCTL_SKSTAT, 0x03, 0, &mut scheduler);
    assert_eq!(
        chip.bus_read(pokey::SKREST_RANDOM, 5000),
        standalone.bus_read(pokey::SKREST_RANDOM, 5000)
    );
    assert!(chip.audio().unwrap().samples_available() > 0);
}

#[test]
fn test_pot_scan_registers() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.set_pot(2, 4);
    chip.bus_write(pokey::POTGO, 0, 100, &mut scheduler);
    assert_eq!(chip.bus_read(pokey::AUDF2_POT2, 100 + 28), 1);
    assert_eq!(chip.bus_read(pokey::AUDCTL_ALLPOT, 100 + 4 * 28), 0xFB);
    assert_eq!(chip.bus_read(pokey::AUDF2_POT2, 100 + 100 * 28), 4);
    assert_eq!(chip.bus_read(pokey::AUDF1_POT0, 100 + 100 * 28), 100);
}

#[test]
fn test_keyboard_irq() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.key_pressed(0x3F);
    assert!(!chip.request_irq(IRQ_OTHER_KEY_PRESSED));
    chip.bus_write(pokey::IRQEN_IRQST, 0xC0, 0, &mut scheduler);
    assert!(chip.request_irq(IRQ_OTHER_KEY_PRESSED));
    assert_eq!(chip.bus_read(pokey::IRQEN_IRQST, 0), 0xBF);
    assert_eq!(chip.bus_read(pokey::STIMER_KBCODE, 0), 0x3F);

    chip.set_skstat_bits(0x04, false);
    assert_eq!(chip.bus_read(pokey::SKCTL_SKSTAT, 0), 0xFB);
    chip.set_skstat_bits(0x04, true);
    assert_eq!(chip.bus_read(pokey::SKCTL_SKSTAT, 0), 0xFF);
}

#[test]
fn test_load_state_rebuilds_audio() {
    let (mut chip, mut scheduler) = running_pokey();
    chip.bus_write(pokey::AUDC1_POT1, 0x1F, 0, &mut scheduler);
    let state = chip.save_state();

    let mut restored = Pokey::new();
    restored.enable_audio(48000, 512, 0);
    restored.load_state(state.clone(), 10_000);
    assert_eq!(restored.save_state(), state);
    restored.sync_audio(10_370);
    // Only the cycles after the restore point are rendered.
    assert_eq!(restored.audio().unwrap().samples_available(), 10);
}
