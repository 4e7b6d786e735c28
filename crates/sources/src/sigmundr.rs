//! Composite frame layout of the Sigmundr flight computer
//!
//! One 94-byte frame carries, at fixed offsets, the error flags, the RTC
//! time of day, the loop timer, both battery voltages, four IMU samples,
//! two barometers, the magnetometer and the pitot tube.

use sigmundr_core::{
    CLOCK_HOUR_FIELD, CLOCK_MICROSECOND_FIELD, CLOCK_MINUTE_FIELD, CLOCK_SECOND_FIELD,
};
use sigmundr_types::{ByteOrder, Conversion, FieldDescriptor, SensorDefinition};

/// Layout id under which the Sigmundr frame is registered
pub const SIGMUNDR_LAYOUT_ID: &str = "sigmundr";

/// Error and wait flags of the `errmsg` word, in bit order
pub const ERROR_FLAGS: [&str; 16] = [
    "ERR_INIT_IMU2",
    "ERR_INIT_IMU3",
    "ERR_INIT_BMP2",
    "ERR_INIT_BMP3",
    "ERR_INIT_MAG",
    "ERR_INIT_ADC",
    "ERR_INIT_SD_CARD",
    "ERR_LOOP_TIME",
    "ERR_SPI2_ERRORCALLBACK",
    "ERR_SPI3_ERRORCALLBACK",
    "ERR_ADC_ERRORCALLBACK",
    "ERR_UART_ERRORCALLBACK",
    "WAIT_IMU2_FINISH_BEFORE_GPS",
    "WAIT_IMU3_FINISH_BEFORE_BMP3",
    "WAIT_GPS_FINISH_BEFORE_BMP2",
    "WAIT_ADC_TO_FINISH",
];

/// ADC reference voltage and resolution of the battery channels
const ADC_REFERENCE: f64 = 3.3;
const ADC_LEVELS: f64 = 4096.0;

/// Pitot transducer output counts at zero and full scale
const PITOT_LOW: f64 = 1638.0;
const PITOT_HIGH: f64 = 14747.0;
/// Full-scale range and gain, as the flight software applies them
const PITOT_RANGE: f64 = 5.0;
const PITOT_GAIN: f64 = 34474.0;

fn quotient(divisor: f64) -> Conversion {
    Conversion::Quotient {
        divisor,
        offset: 0.0,
    }
}

fn errmsg() -> SensorDefinition {
    let fields = ERROR_FLAGS
        .iter()
        .enumerate()
        .map(|(bit, name)| {
            FieldDescriptor::new(
                *name,
                0,
                2,
                ByteOrder::Big,
                false,
                Conversion::Bit { bit: bit as u8 },
            )
        })
        .collect();
    SensorDefinition::new("errmsg", "Error flags", 2, 2, fields)
}

fn rtc() -> SensorDefinition {
    let byte = |name: &str, offset, conversion| {
        FieldDescriptor::new(name, offset, 1, ByteOrder::Big, false, conversion)
    };
    SensorDefinition::new(
        "rtc",
        "RTC",
        4,
        4,
        vec![
            byte(CLOCK_HOUR_FIELD, 0, Conversion::Identity).with_unit("h"),
            byte(CLOCK_MINUTE_FIELD, 1, Conversion::Identity).with_unit("min"),
            byte(CLOCK_SECOND_FIELD, 2, Conversion::Identity).with_unit("s"),
            byte(
                CLOCK_MICROSECOND_FIELD,
                3,
                Conversion::SubsecondMicros { divisions: 256.0 },
            )
            .with_unit("µs"),
        ],
    )
    .as_clock_source()
}

fn timer() -> SensorDefinition {
    SensorDefinition::new(
        "timer",
        "Timer",
        8,
        4,
        vec![FieldDescriptor::new(
            "Timer",
            0,
            4,
            ByteOrder::Little,
            false,
            Conversion::Scale { factor: 5e-4 },
        )
        .with_unit("s")],
    )
}

fn batteries() -> SensorDefinition {
    let battery = |name: &str, offset, divider| {
        FieldDescriptor::new(
            name,
            offset,
            2,
            ByteOrder::Little,
            false,
            Conversion::Adc {
                reference: ADC_REFERENCE,
                levels: ADC_LEVELS,
                divider,
            },
        )
        .with_unit("V")
    };
    SensorDefinition::new(
        "batteries",
        "Batteries",
        12,
        4,
        vec![battery("Battery1", 0, 4.030), battery("Battery2", 2, 2.786)],
    )
}

fn imu() -> SensorDefinition {
    let axis = |name: &str, offset, conversion: Conversion, unit: &str| {
        FieldDescriptor::new(name, offset, 2, ByteOrder::Big, true, conversion).with_unit(unit)
    };
    SensorDefinition::new(
        "imu",
        "IMU",
        16,
        14,
        vec![
            axis("Acc_X", 0, quotient(2048.0), "g"),
            axis("Acc_Y", 2, quotient(2048.0), "g"),
            axis("Acc_Z", 4, quotient(2048.0), "g"),
            axis(
                "Temp",
                6,
                Conversion::Quotient {
                    divisor: 326.8,
                    offset: 25.0,
                },
                "°C",
            ),
            axis("Gyro_X", 8, quotient(32.8), "dps"),
            axis("Gyro_Y", 10, quotient(32.8), "dps"),
            axis("Gyro_Z", 12, quotient(32.8), "dps"),
        ],
    )
    .with_sample_count(4)
}

fn bmp(id: &str, name: &str, offset: usize) -> SensorDefinition {
    let word = |field: &str, at, divisor, unit: &str| {
        FieldDescriptor::new(field, at, 4, ByteOrder::Little, true, quotient(divisor))
            .with_unit(unit)
    };
    SensorDefinition::new(
        id,
        name,
        offset,
        8,
        vec![
            word("Temperature", 0, 100.0, "°C"),
            word("Pressure", 4, 256.0, "Pa"),
        ],
    )
}

fn mag() -> SensorDefinition {
    let axis = |name: &str, offset| {
        FieldDescriptor::new(name, offset, 2, ByteOrder::Big, true, quotient(6842.0))
            .with_unit("Gauss")
    };
    SensorDefinition::new(
        "mag",
        "Magnetometer",
        88,
        6,
        vec![axis("Mag_X", 0), axis("Mag_Y", 2), axis("Mag_Z", 4)],
    )
}

fn pitot() -> SensorDefinition {
    SensorDefinition::new(
        "pitot",
        "Pitot",
        92,
        2,
        vec![FieldDescriptor::new(
            "Pressure",
            0,
            2,
            ByteOrder::Big,
            false,
            Conversion::Span {
                low: PITOT_LOW,
                high: PITOT_HIGH,
                range: PITOT_RANGE,
                gain: PITOT_GAIN,
            },
        )
        .with_unit("Pa")],
    )
}

/// Sensor definitions of the Sigmundr frame, in decode order after the clock
pub fn sigmundr_layout() -> Vec<SensorDefinition> {
    vec![
        errmsg(),
        rtc(),
        timer(),
        batteries(),
        imu(),
        bmp("bmp2", "Barometer 2", 72),
        bmp("bmp3", "Barometer 3", 80),
        mag(),
        pitot(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigmundr_core::CompositeDecoder;
    use sigmundr_types::PhysicalValue;

    const FRAME_LEN: usize = 94;

    fn frame_with_clock(subsecond: u8) -> Vec<u8> {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[4..8].copy_from_slice(&[0x01, 0x02, 0x01, subsecond]);
        frame
    }

    fn decoder() -> CompositeDecoder {
        CompositeDecoder::new(sigmundr_layout()).unwrap()
    }

    fn value(decoder: &CompositeDecoder, sensor: &str, field: &str) -> f64 {
        let store = decoder.store(sensor).unwrap();
        store
            .value(store.latest().unwrap(), field)
            .unwrap()
            .as_f64()
    }

    #[test]
    fn test_layout_is_valid_and_spans_94_bytes() {
        let layout = sigmundr_layout();
        for definition in &layout {
            definition.validate().unwrap();
        }
        assert_eq!(decoder().frame_len(), FRAME_LEN);
        assert_eq!(layout.iter().filter(|d| d.is_clock_source).count(), 1);
    }

    #[test]
    fn test_subsecond_step_gives_23_4_ms() {
        let mut decoder = decoder();
        decoder.decode_frame(&frame_with_clock(0x0B));
        decoder.decode_frame(&frame_with_clock(0x11));

        for id in ["timer", "batteries", "pitot", "rtc"] {
            let elapsed = decoder.store(id).unwrap().latest().unwrap().elapsed_seconds;
            assert!((elapsed - 0.0234375).abs() < 1e-5, "{id}: {elapsed}");
        }
    }

    #[test]
    fn test_zero_battery_reads_zero_volts() {
        let mut decoder = decoder();
        decoder.decode_frame(&frame_with_clock(0));
        assert_eq!(value(&decoder, "batteries", "Battery1"), 0.0);
        assert_eq!(value(&decoder, "batteries", "Battery2"), 0.0);
    }

    #[test]
    fn test_zero_pitot_reads_negative_pressure() {
        let mut decoder = decoder();
        decoder.decode_frame(&frame_with_clock(0));
        let expected = (0.0 - 1638.0) / (14747.0 - 1638.0) * 5.0 * 34474.0;
        let pressure = value(&decoder, "pitot", "Pressure");
        assert!((pressure - expected).abs() < 1e-9);
        assert!((pressure + 21538.03).abs() < 0.01);
    }

    #[test]
    fn test_truncated_frame_has_no_pitot_row() {
        let mut decoder = decoder();
        let report = decoder.decode_frame(&frame_with_clock(0)[..92]);
        assert!(report.errors.is_empty());
        assert_eq!(report.rows_for("pitot"), 0);
        // Mag_Z shares bytes 92..94 with the pitot
        assert_eq!(report.rows_for("mag"), 0);
        assert_eq!(report.rows_for("imu"), 4);
        assert!(decoder.store("pitot").unwrap().is_empty());
    }

    #[test]
    fn decodes_every_imu_sample() {
        let mut frame = frame_with_clock(0);
        for sample in 0..4 {
            // Acc_X of each sample: 2048 * (sample + 1) -> (sample + 1) g
            let raw = (2048 * (sample as i16 + 1)).to_be_bytes();
            let at = 16 + sample * 14;
            frame[at..at + 2].copy_from_slice(&raw);
        }
        let mut decoder = decoder();
        decoder.decode_frame(&frame);

        let imu = decoder.store("imu").unwrap();
        assert_eq!(imu.len(), 4);
        let acc_x: Vec<f64> = imu
            .column("Acc_X")
            .unwrap()
            .iter()
            .map(PhysicalValue::as_f64)
            .collect();
        assert_eq!(acc_x, [1.0, 2.0, 3.0, 4.0]);
        assert!(imu.rows().iter().all(|r| r.elapsed_seconds == 0.0));
    }

    #[test]
    fn test_same_frame_twice_gives_identical_values() {
        let mut frame = frame_with_clock(0x40);
        frame[72..80].copy_from_slice(&[0x2C, 0x09, 0, 0, 0x00, 0x2C, 0x8B, 0x01]);
        frame[88..90].copy_from_slice(&(-6842i16).to_be_bytes());

        let mut decoder = decoder();
        decoder.decode_frame(&frame);
        decoder.decode_frame(&frame);

        let bmp2 = decoder.store("bmp2").unwrap();
        assert_eq!(bmp2.rows()[0].values, bmp2.rows()[1].values);
        assert_eq!(bmp2.rows()[1].elapsed_seconds, 0.0);
        // 0x092C = 2348 -> 23.48 °C
        let temperature = value(&decoder, "bmp2", "Temperature");
        assert!((temperature - 23.48).abs() < 1e-9);
        assert!((value(&decoder, "mag", "Mag_X") + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_error_flags_follow_bit_order() {
        let mut frame = frame_with_clock(0);
        // Big-endian word with bits 4 and 15 set
        frame[2..4].copy_from_slice(&0x8010u16.to_be_bytes());
        let mut decoder = decoder();
        decoder.decode_frame(&frame);

        let errmsg = decoder.store("errmsg").unwrap();
        let row = errmsg.latest().unwrap();
        let on = Some(PhysicalValue::Integer(1));
        let set: Vec<&str> = ERROR_FLAGS
            .iter()
            .copied()
            .filter(|flag| errmsg.value(row, flag) == on)
            .collect();
        assert_eq!(set, ["ERR_INIT_MAG", "WAIT_ADC_TO_FINISH"]);
    }

    #[test]
    fn test_timer_is_little_endian_ticks() {
        let mut frame = frame_with_clock(0);
        frame[8..12].copy_from_slice(&2000u32.to_le_bytes());
        let mut decoder = decoder();
        decoder.decode_frame(&frame);
        assert!((value(&decoder, "timer", "Timer") - 1.0).abs() < 1e-9);
    }

    /// Two frames as recorded on the bench, one RTC subsecond step apart
    fn bench_frame(subsecond: u8) -> Vec<u8> {
        let imu_pair: [&[u8]; 2] = [
            b"\x07\xAE\x06\xDE\x07\xDE\x07\xDE\x07\xDE\x07\xDE\x07\xDE",
            b"\x07\xDE\x00\xDE\x07\xDE\x07\xDE\x07\xDE\x07\xDE\x07\xDE",
        ];
        let mut frame = Vec::with_capacity(96);
        frame.extend_from_slice(b"\x01\x00");
        frame.extend_from_slice(b"\x04\x03");
        frame.extend_from_slice(&[0x01, 0x02, 0x01, subsecond]);
        frame.extend_from_slice(b"\x10\x27\x00\x00");
        frame.extend_from_slice(&[0; 4]);
        for _ in 0..2 {
            frame.extend(imu_pair.concat());
        }
        frame.extend_from_slice(b"\xD0\x07\x00\x00\x00\xCD\x8B\x01");
        frame.extend_from_slice(&[0; 8]);
        frame.extend_from_slice(&[0; 6]);
        frame.extend_from_slice(&[0; 2]);
        frame
    }

    #[test]
    fn test_bench_recording_decodes_to_known_values() {
        let mut decoder = decoder();
        for subsecond in [0x0B, 0x11] {
            let report = decoder.decode_frame(&bench_frame(subsecond));
            assert!(report.errors.is_empty());
        }

        let rtc = decoder.store("rtc").unwrap();
        assert_eq!(rtc.len(), 2);
        let micros: Vec<_> = rtc
            .rows()
            .iter()
            .map(|row| rtc.value(row, CLOCK_MICROSECOND_FIELD))
            .collect();
        assert_eq!(
            micros,
            [
                Some(PhysicalValue::Integer(42_968)),
                Some(PhysicalValue::Integer(66_406)),
            ]
        );
        assert!((rtc.rows()[1].elapsed_seconds - 0.023438).abs() < 1e-9);

        // 0x07D0 = 2000 -> 20.00 °C, 0x018BCD00 / 256 = 101325 Pa
        assert_eq!(value(&decoder, "bmp2", "Temperature"), 20.0);
        assert_eq!(value(&decoder, "bmp2", "Pressure"), 101_325.0);
        assert!((value(&decoder, "timer", "Timer") - 5.0).abs() < 1e-9);
        assert_eq!(value(&decoder, "batteries", "Battery1"), 0.0);

        // Err_msg word 0x0403: bits 0, 1 and 10
        let errmsg = decoder.store("errmsg").unwrap();
        let row = errmsg.latest().unwrap();
        let on = Some(PhysicalValue::Integer(1));
        let set: Vec<&str> = ERROR_FLAGS
            .iter()
            .copied()
            .filter(|flag| errmsg.value(row, flag) == on)
            .collect();
        assert_eq!(
            set,
            [
                "ERR_INIT_IMU2",
                "ERR_INIT_IMU3",
                "ERR_ADC_ERRORCALLBACK",
            ]
        );

        let imu = decoder.store("imu").unwrap();
        assert_eq!(imu.len(), 8);
        let acc_x: Vec<f64> = imu.rows()[..4]
            .iter()
            .map(|row| row.values[0].as_f64())
            .collect();
        let (even, odd) = (1966.0 / 2048.0, 2014.0 / 2048.0);
        assert_eq!(acc_x, [even, odd, even, odd]);
        assert_eq!(imu.rows()[1].values[1].as_f64(), 222.0 / 2048.0);
    }
}
