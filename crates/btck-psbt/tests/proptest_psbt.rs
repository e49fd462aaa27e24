use proptest::prelude::*;

use btck_primitives::chainhash::Hash;
use btck_psbt::{Psbt, PsbtInput, PsbtOutput};
use btck_transaction::{Script, Transaction, TxInput, TxOutput};

/// Strategy to generate a random unsigned transaction.
fn arb_unsigned_transaction() -> impl Strategy<Value = Transaction> {
    let arb_input = (
        prop::array::uniform32(any::<u8>()), // prev txid
        any::<u32>(),                        // vout
        any::<u32>(),                        // sequence
    )
        .prop_map(|(txid, vout, sequence)| {
            let mut input = TxInput::new(Hash::new(txid), vout);
            input.sequence = sequence;
            input
        });

    let arb_output = (any::<u64>(), prop::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(satoshis, script_bytes)| {
            TxOutput::new(satoshis, Script::from_bytes(&script_bytes))
        });

    (
        any::<u32>(),
        any::<u32>(),
        prop::collection::vec(arb_input, 1..8),
        prop::collection::vec(arb_output, 0..8),
    )
        .prop_map(|(version, lock_time, inputs, outputs)| {
            let mut tx = Transaction::new(version, lock_time);
            for input in inputs {
                tx.add_input(input);
            }
            for output in outputs {
                tx.add_output(output);
            }
            tx
        })
}

/// Strategy for map entries with key types no field decoder claims.
fn arb_unknown_entries() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    prop::collection::vec(
        (
            0x20u8..0xf0,
            prop::collection::vec(any::<u8>(), 0..8),
            prop::collection::vec(any::<u8>(), 0..32),
        )
            .prop_map(|(key_type, key_rest, value)| {
                let mut key = vec![key_type];
                key.extend_from_slice(&key_rest);
                (key, value)
            }),
        0..4,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn serialize_deserialize_roundtrip(tx in arb_unsigned_transaction()) {
        let psbt = Psbt::new(tx).unwrap();
        let bytes = psbt.to_bytes();

        prop_assert_eq!(bytes.len(), psbt.get_length());
        let decoded = Psbt::from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded, psbt);
    }

    #[test]
    fn base64_roundtrip(tx in arb_unsigned_transaction()) {
        let psbt = Psbt::new(tx).unwrap();
        let decoded = Psbt::from_base64(&psbt.to_base64()).unwrap();
        prop_assert_eq!(decoded, psbt);
    }

    #[test]
    fn unknown_keys_survive_roundtrip(
        tx in arb_unsigned_transaction(),
        input_entries in arb_unknown_entries(),
        output_entries in arb_unknown_entries(),
    ) {
        let mut psbt = Psbt::new(tx).unwrap();
        let mut input = PsbtInput::new();
        for (key, value) in input_entries {
            input.unknowns.insert(key, value);
        }
        psbt.inputs[0] = input;
        if let Some(slot) = psbt.outputs.first_mut() {
            let mut output = PsbtOutput::new();
            for (key, value) in output_entries {
                output.unknowns.insert(key, value);
            }
            *slot = output;
        }

        let bytes = psbt.to_bytes();
        prop_assert_eq!(bytes.len(), psbt.get_length());
        let decoded = Psbt::from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded.to_bytes(), bytes);
        prop_assert_eq!(decoded, psbt);
    }

    #[test]
    fn fee_is_none_without_utxo_data(tx in arb_unsigned_transaction()) {
        let psbt = Psbt::new(tx).unwrap();
        prop_assert_eq!(psbt.fee(), None);
    }
}
