//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 分流场景测试（EOS 重标记、零接收端口、clone 失败）
//! - 随机化守恒测试（固定种子）

#[cfg(test)]
mod support {
    use contracts::{
        BufferLayout, ChannelBuffer, ContractError, MediaFormat, MetadataEvent, MetadataHandler,
        PortId, PortState, StreamFrame,
    };
    use splitter::{OutputPort, Splitter};

    /// Handler that fails the clone requests whose sequence numbers are listed
    #[derive(Debug, Default)]
    pub struct ScriptedHandler {
        pub fail_on: Vec<usize>,
        pub clone_calls: usize,
        pub dropped: Vec<MetadataEvent>,
    }

    impl MetadataHandler for ScriptedHandler {
        fn clone_event(&mut self, event: &MetadataEvent) -> Result<MetadataEvent, ContractError> {
            let call = self.clone_calls;
            self.clone_calls += 1;
            if self.fail_on.contains(&call) {
                return Err(ContractError::metadata_clone(event.id(), "injected failure"));
            }
            Ok(event.duplicate())
        }

        fn destroy(&mut self, event: MetadataEvent, dropped: bool) {
            if dropped {
                self.dropped.push(event);
            }
        }
    }

    pub fn mono() -> MediaFormat {
        MediaFormat {
            num_channels: 1,
            layout: BufferLayout::Interleaved,
            ..Default::default()
        }
    }

    pub fn splitter_with<H: MetadataHandler>(states: &[PortState], handler: H) -> Splitter<H> {
        let ports = states
            .iter()
            .enumerate()
            .map(|(i, &state)| OutputPort::new(PortId(i as u32 + 1)).with_state(state))
            .collect();
        let mut splitter = Splitter::new(ports, handler);
        splitter
            .set_input_media_format(mono())
            .expect("valid format");
        splitter
    }

    pub fn input(len: usize) -> StreamFrame {
        let mut frame =
            StreamFrame::with_buffers(vec![ChannelBuffer::from_bytes(vec![0x5Au8; len])]);
        frame.flags.end_of_frame = true;
        frame.flags.timestamp_valid = true;
        frame
    }

    pub fn outputs(n: usize, capacity: usize) -> Vec<Option<StreamFrame>> {
        (0..n)
            .map(|_| Some(StreamFrame::output(1, capacity)))
            .collect()
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{MetadataId, SplitterBlueprint};

    #[test]
    fn test_eos_id_is_stable() {
        assert_eq!(MetadataId::EOS, MetadataId(0x0A00_1000));
        assert_eq!(MetadataId::EOS.to_string(), "0x0A001000");
    }

    #[test]
    fn test_blueprint_json_snapshot() {
        let json = r#"{
            "media_format": {"sample_rate": 48000, "bits_per_sample": 16, "num_channels": 2},
            "ports": [{"port_id": 1}]
        }"#;
        let blueprint: SplitterBlueprint = parse_json(json);
        assert_eq!(blueprint.ports.len(), 1);
        assert!(blueprint.metadata_propagation.is_none());
    }

    fn parse_json(json: &str) -> SplitterBlueprint {
        config_loader::ConfigLoader::load_from_str(json, config_loader::ConfigFormat::Json)
            .expect("snapshot parses")
    }
}

#[cfg(test)]
mod scenario_tests {
    use contracts::{
        EosFlags, FrameStatus, MetadataEvent, MetadataId, MetadataPropagationConfig, PortId,
        PortMetadataConfig, PortState,
    };
    use splitter::{HeapMetadataHandler, SplitterError};

    use crate::support::*;

    const VOLUME: MetadataId = MetadataId(0x0A00_3000);

    fn eos_internal(frame: &contracts::StreamFrame) -> Vec<bool> {
        frame
            .metadata
            .iter()
            .filter_map(|e| e.eos_flags().map(|f| f.internal))
            .collect()
    }

    /// D1 passthrough enabled, D2 passthrough disabled, D3 inactive
    #[test]
    fn test_three_destination_eos() {
        let mut splitter = splitter_with(
            &[PortState::Started, PortState::Started, PortState::Inactive],
            HeapMetadataHandler::new(),
        );
        splitter.install_policy(&MetadataPropagationConfig {
            ports: vec![
                PortMetadataConfig {
                    port_id: PortId(1),
                    allowed: vec![MetadataId::EOS],
                },
                PortMetadataConfig {
                    port_id: PortId(2),
                    allowed: vec![VOLUME],
                },
            ],
        });

        let mut src = input(32);
        src.metadata.push(MetadataEvent::eos(EosFlags::flushing()));
        src.flags.marker_eos = true;
        let mut outs = outputs(3, 64);

        let report = splitter.process(&mut src, &mut outs).unwrap();

        let d1 = outs[0].as_ref().unwrap();
        let d2 = outs[1].as_ref().unwrap();
        let d3 = outs[2].as_ref().unwrap();

        assert_eq!(eos_internal(d1), vec![false]);
        assert!(d1.flags.marker_eos);
        assert_eq!(eos_internal(d2), vec![true]);
        assert!(d2.flags.marker_eos);
        assert!(d3.metadata.is_empty());
        assert!(!d3.flags.marker_eos);
        assert_eq!(d3.actual_len(), 0);

        assert!(src.metadata.is_empty());
        assert!(!src.flags.marker_eos);
        assert_eq!(report.metadata_transferred, 1);
        assert_eq!(report.metadata_cloned, 1);
        assert_eq!(report.status(), FrameStatus::Ok);
    }

    #[test]
    fn test_zero_active_destinations() {
        let mut splitter = splitter_with(
            &[PortState::Inactive, PortState::Closed],
            ScriptedHandler::default(),
        );
        let mut src = input(16);
        src.metadata.push(MetadataEvent::eos(EosFlags::flushing()));
        let mut outs = outputs(2, 16);

        let report = splitter.process(&mut src, &mut outs).unwrap();

        assert_eq!(report.bytes_delivered(), 0);
        assert!(report.deliveries.is_empty());
        assert_eq!(report.metadata_dropped, 1);
        assert_eq!(splitter.handler().dropped.len(), 1);
        assert!(outs.iter().flatten().all(|f| f.metadata.is_empty()));
        assert!(src.metadata.is_empty());
    }

    #[test]
    fn test_clone_failure_on_second_of_three() {
        let handler = ScriptedHandler {
            fail_on: vec![0],
            ..Default::default()
        };
        let mut splitter = splitter_with(&[PortState::Started; 3], handler);
        splitter.install_policy(&MetadataPropagationConfig {
            ports: (1..=3)
                .map(|id| PortMetadataConfig {
                    port_id: PortId(id),
                    allowed: vec![VOLUME, MetadataId::EOS],
                })
                .collect(),
        });

        let mut src = input(24);
        src.metadata
            .push(MetadataEvent::custom(VOLUME, vec![1u8, 2]).unwrap().at_offset(1));
        src.metadata
            .push(MetadataEvent::custom(VOLUME, vec![3u8]).unwrap().at_offset(2));
        let mut outs = outputs(3, 24);

        let report = splitter.process(&mut src, &mut outs).unwrap();

        let offsets = |i: usize| -> Vec<u32> {
            outs[i]
                .as_ref()
                .unwrap()
                .metadata
                .iter()
                .map(MetadataEvent::offset)
                .collect()
        };
        // First event: only the transfer survives
        assert_eq!(offsets(0), vec![1, 2]);
        assert_eq!(offsets(1), vec![2]);
        assert_eq!(offsets(2), vec![2]);

        assert_eq!(report.status(), FrameStatus::Degraded);
        assert_eq!(report.clone_failures.len(), 1);
        assert_eq!(report.clone_failures[0].port_index, 1);

        // Data still fanned out everywhere
        assert_eq!(report.bytes_delivered(), 3 * 24);

        let err = SplitterError::from(report.into_result().unwrap_err());
        assert!(matches!(err, SplitterError::MetadataClone { port_index: 1, .. }));
    }

    #[test]
    fn test_ordering_preserved_per_destination() {
        let mut splitter = splitter_with(&[PortState::Started; 2], HeapMetadataHandler::new());
        splitter.install_policy(&MetadataPropagationConfig {
            ports: vec![
                PortMetadataConfig {
                    port_id: PortId(1),
                    allowed: vec![VOLUME],
                },
                PortMetadataConfig {
                    port_id: PortId(2),
                    allowed: vec![VOLUME, MetadataId::EOS],
                },
            ],
        });

        let mut src = input(8);
        src.metadata
            .push(MetadataEvent::custom(VOLUME, vec![]).unwrap().at_offset(10));
        src.metadata
            .push(MetadataEvent::custom(MetadataId(0x99), vec![]).unwrap().at_offset(20));
        src.metadata
            .push(MetadataEvent::eos(EosFlags::non_flushing()).at_offset(30));
        src.metadata
            .push(MetadataEvent::custom(VOLUME, vec![]).unwrap().at_offset(40));
        let mut outs = outputs(2, 8);

        splitter.process(&mut src, &mut outs).unwrap();

        let offsets: Vec<Vec<u32>> = outs
            .iter()
            .flatten()
            .map(|f| f.metadata.iter().map(MetadataEvent::offset).collect())
            .collect();
        assert_eq!(offsets[0], vec![10, 30, 40]);
        assert_eq!(offsets[1], vec![10, 30, 40]);
    }

    #[test]
    fn test_capacity_clamp() {
        let mut splitter = splitter_with(&[PortState::Started; 3], HeapMetadataHandler::new());
        let mut src = input(100);
        let mut outs = vec![
            Some(contracts::StreamFrame::output(1, 40)),
            Some(contracts::StreamFrame::output(1, 100)),
            Some(contracts::StreamFrame::output(1, 256)),
        ];

        let report = splitter.process(&mut src, &mut outs).unwrap();

        let bytes: Vec<usize> = report.deliveries.iter().map(|d| d.bytes).collect();
        assert_eq!(bytes, vec![40, 100, 100]);
    }

    #[test]
    fn test_frame_flag_reset() {
        for active in 0..=3usize {
            let states: Vec<PortState> = (0..3)
                .map(|i| {
                    if i < active {
                        PortState::Started
                    } else {
                        PortState::Inactive
                    }
                })
                .collect();
            let mut splitter = splitter_with(&states, HeapMetadataHandler::new());
            let mut src = input(8);
            src.metadata.push(MetadataEvent::eos(EosFlags::flushing()));

            splitter.process(&mut src, &mut outputs(3, 8)).unwrap();

            assert!(!src.flags.end_of_frame, "active={active}");
            assert!(src.metadata.is_empty(), "active={active}");
        }
    }

    #[test]
    fn test_port_restart_between_frames() {
        let mut splitter = splitter_with(&[PortState::Started; 2], HeapMetadataHandler::new());

        splitter.set_port_state(1, PortState::Closed).unwrap();
        let report = splitter.process(&mut input(8), &mut outputs(2, 8)).unwrap();
        assert_eq!(report.deliveries.len(), 1);

        splitter.set_port_state(1, PortState::Started).unwrap();
        let report = splitter.process(&mut input(8), &mut outputs(2, 8)).unwrap();
        assert_eq!(report.deliveries.len(), 2);
        assert_eq!(splitter.stats().frames_processed, 2);
    }
}

#[cfg(test)]
mod conservation_tests {
    use contracts::{
        EosFlags, MetadataEvent, MetadataId, MetadataPropagationConfig, PortId,
        PortMetadataConfig, PortState, StreamFrame,
    };
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::support::*;

    const IDS: [MetadataId; 4] = [
        MetadataId(0x100),
        MetadataId(0x200),
        MetadataId(0x300),
        MetadataId::EOS,
    ];

    fn random_policy(rng: &mut StdRng, ports: u32) -> Option<MetadataPropagationConfig> {
        if !rng.random_bool(0.8) {
            return None;
        }

        let mut config = MetadataPropagationConfig::default();
        for id in 1..=ports {
            if !rng.random_bool(0.75) {
                continue;
            }
            let mut allowed = Vec::new();
            for metadata_id in IDS {
                if rng.random_bool(0.5) {
                    allowed.push(metadata_id);
                }
            }
            config.ports.push(PortMetadataConfig {
                port_id: PortId(id),
                allowed,
            });
        }
        Some(config)
    }

    fn random_event(rng: &mut StdRng, offset: u32) -> MetadataEvent {
        let event = match rng.random_range(0..IDS.len()) {
            3 => MetadataEvent::eos(EosFlags {
                flushing: rng.random_bool(0.5),
                internal: rng.random_bool(0.3),
            }),
            i => MetadataEvent::custom(IDS[i], vec![offset as u8; 4]).unwrap(),
        };
        let event = if rng.random_bool(0.3) {
            event.out_of_band()
        } else {
            event
        };
        event.at_offset(offset)
    }

    #[test]
    fn test_randomized_conservation() {
        let mut rng = StdRng::seed_from_u64(0x5EED);

        for round in 0..200 {
            let port_count = rng.random_range(1..=6u32);
            let states: Vec<PortState> = (0..port_count)
                .map(|_| match rng.random_range(0..4) {
                    0 => PortState::Inactive,
                    1 => PortState::Closed,
                    _ => PortState::Started,
                })
                .collect();
            let mut fail_on = Vec::new();
            while rng.random_bool(0.3) {
                fail_on.push(rng.random_range(0..8usize));
            }

            let mut splitter = splitter_with(
                &states,
                ScriptedHandler {
                    fail_on,
                    ..Default::default()
                },
            );
            if let Some(policy) = random_policy(&mut rng, port_count) {
                splitter.install_policy(&policy);
            }

            let event_count = rng.random_range(0..8u32);
            let mut src = input(rng.random_range(1..64));
            for offset in 0..event_count {
                src.metadata.push(random_event(&mut rng, offset));
            }
            let external_eos: Vec<u32> = src
                .metadata
                .iter()
                .filter(|e| e.eos_flags().is_some_and(|f| !f.internal))
                .map(MetadataEvent::offset)
                .collect();

            let mut outs: Vec<Option<StreamFrame>> = (0..port_count)
                .map(|_| {
                    rng.random_bool(0.9)
                        .then(|| StreamFrame::output(1, rng.random_range(0..64)))
                })
                .collect();
            outs[0] = Some(StreamFrame::output(1, 32));

            let report = splitter.process(&mut src, &mut outs).unwrap();

            // Every input event was transferred once or dropped once
            assert_eq!(
                report.metadata_transferred + report.metadata_dropped,
                event_count,
                "round {round}"
            );
            assert_eq!(
                splitter.handler().dropped.len() as u32,
                report.metadata_dropped,
                "round {round}"
            );

            // Every object in an output list is the transfer or one clone
            let delivered: usize = outs.iter().flatten().map(|f| f.metadata.len()).sum();
            assert_eq!(
                delivered as u32,
                report.metadata_transferred + report.metadata_cloned,
                "round {round}"
            );

            assert!(src.metadata.is_empty());
            assert!(!src.flags.end_of_frame);

            for (index, out) in outs.iter().enumerate() {
                let Some(out) = out else { continue };
                let offsets: Vec<u32> = out.metadata.iter().map(MetadataEvent::offset).collect();
                assert!(
                    offsets.windows(2).all(|w| w[0] < w[1]),
                    "round {round}: order broken on port {index}: {offsets:?}"
                );

                let passthrough = splitter.ports()[index].eos_passthrough;
                for event in out.metadata.iter() {
                    let Some(flags) = event.eos_flags() else {
                        continue;
                    };
                    if external_eos.contains(&event.offset()) {
                        assert_eq!(flags.internal, !passthrough, "round {round}");
                    } else {
                        assert!(flags.internal, "round {round}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod config_e2e_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ChannelBuffer, EosFlags, LatchedTimestamp, MetadataEvent, PortState, StreamFrame,
    };
    use observability::FrameMetricsAggregator;
    use splitter::Splitter;

    const CONFIG: &str = r#"
[media_format]
sample_rate = 48000
bits_per_sample = 16
num_channels = 2
layout = "deinterleaved_unpacked"

[[ports]]
port_id = 10

[[ports]]
port_id = 20
ts_propagation = "latched"

[[ports]]
port_id = 30
initial_state = "closed"

[[metadata_propagation.ports]]
port_id = 10
allowed = [0x0A001000]
"#;

    fn stereo_input(len: usize) -> StreamFrame {
        let mut frame = StreamFrame::with_buffers(vec![
            ChannelBuffer::from_bytes(vec![1u8; len]),
            ChannelBuffer::from_bytes(vec![2u8; len]),
        ]);
        frame.timestamp_us = 2_000;
        frame.flags.timestamp_valid = true;
        frame
    }

    #[test]
    fn test_blueprint_to_frames() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let mut splitter = Splitter::from_blueprint(&blueprint).unwrap();
        splitter.latch_timestamp(LatchedTimestamp {
            timestamp_us: 9_000,
            valid: true,
        });
        assert_eq!(splitter.port(2).unwrap().state, PortState::Closed);

        let mut aggregator = FrameMetricsAggregator::new();
        let mut src = stereo_input(96);
        src.metadata.push(MetadataEvent::eos(EosFlags::flushing()));
        let mut outs: Vec<_> = (0..3).map(|_| Some(StreamFrame::output(2, 96))).collect();

        let report = splitter.process(&mut src, &mut outs).unwrap();
        aggregator.update(&report);

        let out0 = outs[0].as_ref().unwrap();
        let out1 = outs[1].as_ref().unwrap();

        assert_eq!(out0.timestamp_us, 2_000);
        assert_eq!(out1.timestamp_us, 9_000);
        assert_eq!(out0.buffers[0].actual_len(), 96);
        assert_eq!(out0.buffers[1].actual_len(), 0);
        assert_eq!(out0.buffers[1].raw(), &[2u8; 96][..]);

        let internal: Vec<bool> = [out0, out1]
            .iter()
            .map(|f| f.metadata.iter().next().and_then(|e| e.eos_flags()).unwrap().internal)
            .collect();
        assert_eq!(internal, vec![false, true]);

        let summary = aggregator.summary();
        assert_eq!(summary.total_frames, 1);
        assert_eq!(summary.total_transferred, 1);
        assert_eq!(summary.total_cloned, 1);
        assert_eq!(summary.port_bytes.len(), 2);
    }

    #[test]
    fn test_bundled_config_loads() {
        let blueprint = ConfigLoader::load_from_str(
            include_str!("../../../configs/splitter.toml"),
            ConfigFormat::Toml,
        )
        .unwrap();
        let splitter = Splitter::from_blueprint(&blueprint).unwrap();

        assert_eq!(splitter.ports().len(), 3);
        assert!(splitter.ports()[0].eos_passthrough);
        assert!(!splitter.ports()[1].eos_passthrough);
        assert!(splitter
            .is_metadata_blocked(2, contracts::MetadataId(0x0A00_2000))
            .unwrap());
    }
}
