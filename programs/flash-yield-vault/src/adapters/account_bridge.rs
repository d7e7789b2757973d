use anchor_lang::prelude::*;

use crate::errors::VaultError;

/// Builds a CPI instruction from `remaining_accounts` and invokes it with the
/// vault PDA's signer seeds.
///
/// The remaining_accounts pattern:
///   accounts[0]  = external program (executable)
///   accounts[1..] = that program's instruction accounts, in its order
///
/// `signer` is marked as a signer in the instruction even though its
/// AccountInfo is not, since the runtime grants the signature from the seeds.
pub fn invoke_protocol_cpi_signed<'info>(
    program: &AccountInfo<'info>,
    accounts: &[AccountInfo<'info>],
    data: Vec<u8>,
    signer: &Pubkey,
    signer_seeds: &[&[&[u8]]],
) -> Result<()> {
    let account_metas: Vec<AccountMeta> = accounts
        .iter()
        .map(|a| {
            let is_signer = a.is_signer || a.key == signer;
            if a.is_writable {
                AccountMeta::new(*a.key, is_signer)
            } else {
                AccountMeta::new_readonly(*a.key, is_signer)
            }
        })
        .collect();

    let ix = anchor_lang::solana_program::instruction::Instruction {
        program_id: *program.key,
        accounts: account_metas,
        data,
    };

    let mut all_accounts = vec![program.clone()];
    all_accounts.extend_from_slice(accounts);

    anchor_lang::solana_program::program::invoke_signed(&ix, &all_accounts, signer_seeds)?;
    Ok(())
}

/// 8-byte Anchor discriminator followed by the little-endian payload.
pub fn instruction_data(discriminator: [u8; 8], payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + payload.len());
    data.extend_from_slice(&discriminator);
    data.extend_from_slice(payload);
    data
}

/// Splits a `remaining_accounts` segment into the program account and its
/// instruction accounts. The caller checks the program key.
pub fn split_program<'a, 'info>(
    accounts: &'a [AccountInfo<'info>],
) -> Result<(&'a AccountInfo<'info>, &'a [AccountInfo<'info>])> {
    match accounts.split_first() {
        Some((program, rest)) if program.executable => Ok((program, rest)),
        _ => err!(VaultError::InvalidRemainingAccounts),
    }
}
