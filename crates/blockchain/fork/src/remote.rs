use std::sync::Arc;

use devnet_blockchain_api::{Block, BlockchainError, Header, RemoteBlockSource, RemoteTransaction};
use devnet_primitives::{B256, TxKind};
use devnet_rpc_client::{RpcBlock, RpcClient, RpcClientError, RpcTransaction};
use devnet_signer::{EcdsaSignature, FakeableSignature};
use devnet_transaction::{Signed, request};
use tokio::runtime;

/// A block source backed by a remote Ethereum node
#[derive(Debug)]
pub struct RpcRemoteBlocks {
    client: Arc<RpcClient>,
    runtime: runtime::Handle,
}

impl RpcRemoteBlocks {
    /// Constructs a new instance.
    pub fn new(runtime: runtime::Handle, client: Arc<RpcClient>) -> Self {
        Self { client, runtime }
    }

    fn block_on<T>(
        &self,
        future: impl Future<Output = Result<T, RpcClientError>>,
    ) -> Result<T, BlockchainError> {
        Ok(tokio::task::block_in_place(move || {
            self.runtime.block_on(future)
        })?)
    }
}

impl RemoteBlockSource for RpcRemoteBlocks {
    fn block_by_number(&self, number: u64) -> Result<Option<Block>, BlockchainError> {
        self.block_on(self.client.get_block_by_number(number))?
            .map(block_from_rpc)
            .transpose()
    }

    fn block_by_hash(&self, hash: &B256) -> Result<Option<Block>, BlockchainError> {
        self.block_on(self.client.get_block_by_hash(*hash))?
            .map(block_from_rpc)
            .transpose()
    }

    fn transaction_by_hash(
        &self,
        transaction_hash: &B256,
    ) -> Result<Option<RemoteTransaction>, BlockchainError> {
        self.block_on(self.client.get_transaction_by_hash(*transaction_hash))?
            .map(|transaction| {
                let block_number = transaction.block_number.map(|number| number.to::<u64>());

                Ok(RemoteTransaction {
                    transaction: transaction_from_rpc(transaction)?,
                    block_number,
                })
            })
            .transpose()
    }
}

fn block_from_rpc(block: RpcBlock<RpcTransaction>) -> Result<Block, BlockchainError> {
    let (Some(hash), Some(number)) = (block.hash, block.number) else {
        return Err(BlockchainError::InvalidRemoteData {
            hash: block.parent_hash,
            reason: "block is pending",
        });
    };

    let base_fee_per_gas = block
        .base_fee_per_gas
        .map(|base_fee| {
            u128::try_from(base_fee)
                .ok()
                .ok_or(BlockchainError::InvalidRemoteData {
                    hash,
                    reason: "base fee exceeds 128 bits",
                })
        })
        .transpose()?;

    let header = Header {
        parent_hash: block.parent_hash,
        ommers_hash: block.sha3_uncles,
        beneficiary: block.miner,
        state_root: block.state_root,
        transactions_root: block.transactions_root,
        receipts_root: block.receipts_root,
        logs_bloom: block.logs_bloom,
        difficulty: block.difficulty,
        number: number.to(),
        gas_limit: block.gas_limit.to(),
        gas_used: block.gas_used.to(),
        timestamp: block.timestamp.to(),
        extra_data: block.extra_data,
        mix_hash: block.mix_hash,
        nonce: block.nonce,
        base_fee_per_gas,
        withdrawals_root: block.withdrawals_root,
        blob_gas_used: block.blob_gas_used.map(|gas| gas.to()),
        excess_blob_gas: block.excess_blob_gas.map(|gas| gas.to()),
        parent_beacon_block_root: block.parent_beacon_block_root,
        requests_hash: block.requests_hash,
    };

    let transactions = block
        .transactions
        .into_iter()
        .map(transaction_from_rpc)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Block::with_hash_unchecked(header, transactions, hash))
}

/// Converts a remote transaction. Typed transactions are represented by
/// their legacy fields and keep their original hash.
fn transaction_from_rpc(transaction: RpcTransaction) -> Result<Signed, BlockchainError> {
    let gas_price = u128::try_from(transaction.gas_price)
        .ok()
        .ok_or(BlockchainError::InvalidRemoteData {
            hash: transaction.hash,
            reason: "gas price exceeds 128 bits",
        })?;

    let request = request::Legacy {
        nonce: transaction.nonce.to(),
        gas_price,
        gas_limit: transaction.gas.to(),
        kind: transaction.to.map_or(TxKind::Create, TxKind::Call),
        value: transaction.value,
        input: transaction.input,
        chain_id: transaction.chain_id.map(|chain_id| chain_id.to()),
    };

    let signature = FakeableSignature::with_address_unchecked(
        EcdsaSignature {
            r: transaction.r,
            s: transaction.s,
            v: transaction.v.to(),
        },
        transaction.from,
    );

    Ok(Signed::with_hash_unchecked(
        request,
        signature,
        transaction.hash,
    ))
}
