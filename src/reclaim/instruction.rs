//! Close-account instruction building
//!
//! The layout must match SPL Token `CloseAccount` byte for byte, otherwise the
//! token program rejects it.

use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    transaction::Transaction,
};

/// SPL Token `CloseAccount` instruction tag
pub const CLOSE_ACCOUNT_OPCODE: u8 = 9;

/// Build the instruction closing `account` and refunding its rent to `owner`
pub fn build_close_instruction(program_id: &Pubkey, account: &Pubkey, owner: &Pubkey) -> Instruction {
    // Order matters! account, destination, authority
    let accounts = vec![
        AccountMeta::new(*account, false),        // account being closed
        AccountMeta::new(*owner, false),          // destination for reclaimed rent
        AccountMeta::new_readonly(*owner, true),  // owner (signer)
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: vec![CLOSE_ACCOUNT_OPCODE],
    }
}

/// Wrap an instruction in an unsigned transaction bound to `recent_blockhash`
pub fn unsigned_transaction(
    instruction: Instruction,
    fee_payer: &Pubkey,
    recent_blockhash: Hash,
) -> Transaction {
    let mut transaction = Transaction::new_with_payer(&[instruction], Some(fee_payer));
    transaction.message.recent_blockhash = recent_blockhash;
    transaction
}
