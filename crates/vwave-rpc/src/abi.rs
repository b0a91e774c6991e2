//! Contract interfaces used by the client.
//!
//! Only the functions the client calls are declared. Reader functions
//! return flat `uint256[]` arrays that are sliced by a fixed stride.

use alloy::sol;

sol! {
    interface IVaultReader {
        function getVaultTokenInfoV4(
            address vault,
            address positionRouter,
            address weth,
            uint256 usdgAmount,
            address[] tokens
        ) external view returns (uint256[] memory);
    }

    interface IReader {
        function getFundingRates(address vault, address weth, address[] tokens) external view returns (uint256[] memory);
        function getTokenBalances(address account, address[] tokens) external view returns (uint256[] memory);
        function getTokenBalancesWithSupplies(address account, address[] tokens) external view returns (uint256[] memory);
        function getTokenSupply(address token, address[] excludedAccounts) external view returns (uint256);
        function getVestingInfo(address account, address[] vesters) external view returns (uint256[] memory);
        function getPositions(
            address vault,
            address account,
            address[] collateralTokens,
            address[] indexTokens,
            bool[] isLong
        ) external view returns (uint256[] memory);
    }

    interface IRewardReader {
        function getDepositBalances(address account, address[] depositTokens, address[] rewardTrackers) external view returns (uint256[] memory);
        function getStakingInfo(address account, address[] rewardTrackers) external view returns (uint256[] memory);
    }

    interface IVault {
        function totalTokenWeights() external view returns (uint256);
        function getMinPrice(address token) external view returns (uint256);
        function getMaxPrice(address token) external view returns (uint256);
    }

    interface IVlpManager {
        function getAums() external view returns (uint256[] memory);
    }

    interface IPositionRouter {
        function minExecutionFee() external view returns (uint256);
    }

    interface IRouter {
        function approvePlugin(address plugin) external;
        function approvedPlugins(address account, address plugin) external view returns (bool);
    }

    interface IPositionManager {
        function executeSwapOrder(address account, uint256 orderIndex, address feeReceiver) external;
        function executeIncreaseOrder(address account, uint256 orderIndex, address feeReceiver) external;
        function executeDecreaseOrder(address account, uint256 orderIndex, address feeReceiver) external;
    }

    interface IOrderBookReader {
        function getSwapOrders(address orderBook, address account, uint256[] indices) external view returns (uint256[] memory, address[] memory);
        function getIncreaseOrders(address orderBook, address account, uint256[] indices) external view returns (uint256[] memory, address[] memory);
        function getDecreaseOrders(address orderBook, address account, uint256[] indices) external view returns (uint256[] memory, address[] memory);
    }

    interface IOrderBook {
        function swapOrdersIndex(address account) external view returns (uint256);
        function increaseOrdersIndex(address account) external view returns (uint256);
        function decreaseOrdersIndex(address account) external view returns (uint256);

        function createSwapOrder(
            address[] path,
            uint256 amountIn,
            uint256 minOut,
            uint256 triggerRatio,
            bool triggerAboveThreshold,
            uint256 executionFee,
            bool shouldWrap,
            bool shouldUnwrap
        ) external payable;
        function createIncreaseOrder(
            address[] path,
            uint256 amountIn,
            address indexToken,
            uint256 minOut,
            uint256 sizeDelta,
            address collateralToken,
            bool isLong,
            uint256 triggerPrice,
            bool triggerAboveThreshold,
            uint256 executionFee,
            bool shouldWrap
        ) external payable;
        function createDecreaseOrder(
            address indexToken,
            uint256 sizeDelta,
            address collateralToken,
            uint256 collateralDelta,
            bool isLong,
            uint256 triggerPrice,
            bool triggerAboveThreshold
        ) external payable;

        function cancelSwapOrder(uint256 orderIndex) external;
        function cancelIncreaseOrder(uint256 orderIndex) external;
        function cancelDecreaseOrder(uint256 orderIndex) external;
        function cancelMultiple(
            uint256[] swapOrderIndexes,
            uint256[] increaseOrderIndexes,
            uint256[] decreaseOrderIndexes
        ) external;

        function updateSwapOrder(uint256 orderIndex, uint256 minOut, uint256 triggerRatio, bool triggerAboveThreshold) external;
        function updateIncreaseOrder(uint256 orderIndex, uint256 sizeDelta, uint256 triggerPrice, bool triggerAboveThreshold) external;
        function updateDecreaseOrder(
            uint256 orderIndex,
            uint256 collateralDelta,
            uint256 sizeDelta,
            uint256 triggerPrice,
            bool triggerAboveThreshold
        ) external;
    }

    interface IRewardRouter {
        function stakeVwave(uint256 amount) external;
        function stakeEsVwave(uint256 amount) external;
        function unstakeVwave(uint256 amount) external;
        function unstakeEsVwave(uint256 amount) external;
        function handleRewards(
            bool shouldClaimVwave,
            bool shouldStakeVwave,
            bool shouldClaimEsVwave,
            bool shouldStakeEsVwave,
            bool shouldStakeMultiplierPoints,
            bool shouldClaimWeth,
            bool shouldConvertWethToEth
        ) external;
        function signalTransfer(address receiver) external;
        function acceptTransfer(address sender) external;
        function mintAndStakeVlp(address token, uint256 amount, uint256 minUsdg, uint256 minVlp) external returns (uint256);
        function mintAndStakeVlpETH(uint256 minUsdg, uint256 minVlp) external payable returns (uint256);
        function unstakeAndRedeemVlp(address tokenOut, uint256 vlpAmount, uint256 minOut, address receiver) external returns (uint256);
        function unstakeAndRedeemVlpETH(uint256 vlpAmount, uint256 minOut, address receiver) external returns (uint256);
    }

    interface IVester {
        function deposit(uint256 amount) external;
        function withdraw() external;
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
